use fincheck_types::Value;
use std::collections::{BTreeMap, HashMap};

/// 表达式求值时的变量作用域（只读）
pub trait Scope {
    /// 查找变量；`None` 表示键不存在（与值为 null 不同）
    fn get(&self, name: &str) -> Option<&Value>;
}

impl Scope for HashMap<String, Value> {
    fn get(&self, name: &str) -> Option<&Value> {
        HashMap::get(self, name)
    }
}

impl Scope for BTreeMap<String, Value> {
    fn get(&self, name: &str) -> Option<&Value> {
        BTreeMap::get(self, name)
    }
}

impl<S: Scope + ?Sized> Scope for &S {
    fn get(&self, name: &str) -> Option<&Value> {
        (**self).get(name)
    }
}
