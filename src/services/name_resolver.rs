//! 显示名解析
//!
//! 目录名形如 `试卷名__ab12cd34`，末尾的 `__` + 8 位小写十六进制是上游追加的哈希后缀。

use once_cell::sync::Lazy;
use regex::Regex;

static HASH_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:__[0-9a-f]{8})+$").expect("哈希后缀正则非法"));

/// 从目录名得到显示名
///
/// 去掉末尾连续的哈希后缀；若去掉后为空则原样返回。结果再次解析不会变化。
pub fn resolve(raw_name: &str) -> String {
    let stripped = HASH_SUFFIX.replace(raw_name, "");
    if stripped.is_empty() {
        raw_name.to_string()
    } else {
        stripped.into_owned()
    }
}
