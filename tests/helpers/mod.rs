// ==========================================
// 集成测试公共模块
// ==========================================

pub mod api_test_helper;
pub mod fake_backend;
