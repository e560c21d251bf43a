use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 交易记录（由调用方提供，用于构造规则上下文）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// 交易日期
    pub date: NaiveDate,

    /// 金额（负数为支出）
    pub amount: f64,

    /// 币种
    #[serde(default = "default_currency")]
    pub currency: String,

    /// 描述
    #[serde(default)]
    pub description: Option<String>,

    /// 商户
    #[serde(default)]
    pub merchant: Option<String>,

    /// 分类
    #[serde(default)]
    pub category: Option<String>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self {
            date,
            amount,
            currency: default_currency(),
            description: None,
            merchant: None,
            category: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}
