// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 默认过滤器: 本 crate info, 依赖库 warn
const DEFAULT_FILTER: &str = "warn,formula_stock_checker=info,perf=info,slow_request=warn";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器
///   例如: RUST_LOG=debug 或 RUST_LOG=formula_stock_checker::backend=debug
///
/// # 示例
/// ```no_run
/// use formula_stock_checker::logging;
/// logging::init();
/// ```
pub fn init() {
    init_with(false, false);
}

/// CLI 入口: verbose 打开 debug（含每次 HTTP 请求/响应）, json 输出结构化日志
pub fn init_with(verbose: bool, json: bool) {
    let filter = if verbose {
        env_filter("debug,hyper=info,reqwest=info")
    } else {
        env_filter(DEFAULT_FILTER)
    };

    // 日志写 stderr, stdout 留给命令输出
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(verbose)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("日志系统初始化失败: {}", e);
    }
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
