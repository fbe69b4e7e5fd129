//! 日誌初始化

use tracing_subscriber::EnvFilter;

const CRATES: [&str; 7] = [
    "planning",
    "plan_core",
    "plan_forecast",
    "plan_bom",
    "plan_optimizer",
    "plan_mrp",
    "plan_accuracy",
];

/// 預設過濾規則：各計劃 crate 使用指定層級
pub fn default_directive(level: &str) -> String {
    CRATES
        .iter()
        .map(|name| format!("{name}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// 初始化 tracing
///
/// 優先使用 `RUST_LOG`，未設定時以 `level` 作為各計劃 crate 的層級。
/// 重複呼叫不會報錯。
pub fn init_tracing(level: &str) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_directive(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_covers_all_crates() {
        let directive = default_directive("debug");
        assert!(directive.starts_with("planning=debug,"));
        assert!(directive.contains("plan_mrp=debug"));
        assert_eq!(directive.split(',').count(), CRATES.len());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing("warn");
        init_tracing("warn");
    }
}
