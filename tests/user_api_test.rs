// ==========================================
// UserApi / SessionContext 集成测试
// ==========================================
// 测试范围:
// 1. 登录 / 管理员登录 / 登出, 会话持久化与恢复
// 2. 令牌失效时清除会话
// 3. 重置密码（用户名检查 + 管理员重置）
// 4. 用户管理: 创建、列表、修改、删除
// ==========================================

mod helpers;

use chrono::NaiveDate;
use formula_stock_checker::api::{ApiError, EditUserForm, RegisterForm, ResetPasswordForm};
use formula_stock_checker::app::AppState;
use formula_stock_checker::domain::{ActionType, UserRole};
use helpers::api_test_helper::*;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap_or_default()
}

fn register_form() -> RegisterForm {
    RegisterForm {
        username: "new.user1".to_string(),
        password: "Secret123".to_string(),
        confirm_password: "Secret123".to_string(),
        first_name: "Malee".to_string(),
        last_name: "Srisuk".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1995, 2, 14),
        employee_id: "20456".to_string(),
    }
}

// ==========================================
// 登录 / 登出
// ==========================================

#[tokio::test]
async fn test_login_成功并记录日志() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let session = env
        .state
        .user_api
        .login("worker1", "Worker@123")
        .await
        .expect("登录失败");
    assert_eq!(session.user.username, "worker1");
    assert!(!session.is_admin);
    assert_eq!(session.token, "token-worker1");
    assert_eq!(env.state.session.actor(), "worker1");
    assert_eq!(env.logs_of(ActionType::Login).len(), 1);
}

#[tokio::test]
async fn test_login_密码错误() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env
        .state
        .user_api
        .login("worker1", "wrong")
        .await
        .expect_err("密码错误应失败");
    match err {
        ApiError::Unauthorized(msg) => assert_eq!(msg, "Invalid username or password"),
        other => panic!("期望 Unauthorized, 实际: {:?}", other),
    }
    assert!(env.state.session.current().expect("读取会话失败").is_none());
}

#[tokio::test]
async fn test_login_用户名格式错误不请求后端() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env
        .state
        .user_api
        .login("1bad__name", "x")
        .await
        .expect_err("格式错误应失败");
    assert_field_error(&err, "username");
    assert_eq!(env.backend.count_calls("login"), 0);
}

#[tokio::test]
async fn test_admin_login_普通用户被拒绝() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env
        .state
        .user_api
        .admin_login("worker1", "Worker@123")
        .await
        .expect_err("普通用户不能走管理员入口");
    assert!(matches!(err, ApiError::Unauthorized(_)));

    let session = env
        .state
        .user_api
        .admin_login("admin1", "Admin@123")
        .await
        .expect("管理员登录失败");
    assert!(session.is_admin);
    let logs = env.logs_of(ActionType::Login);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].detail.as_deref(), Some("admin"));
}

#[tokio::test]
async fn test_session_重启后恢复_登出后清除() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_worker().await;

    let restarted =
        AppState::with_backend(env.db_path.clone(), env.backend.clone()).expect("重建失败");
    let restored = restarted
        .session
        .current()
        .expect("读取会话失败")
        .expect("会话应已恢复");
    assert_eq!(restored.user.username, "worker1");

    let previous = restarted.user_api.logout().expect("登出失败");
    assert!(previous.is_some());
    assert_eq!(restarted.session.actor(), "anonymous");

    let again =
        AppState::with_backend(env.db_path.clone(), env.backend.clone()).expect("重建失败");
    assert!(again.session.current().expect("读取会话失败").is_none());
}

#[tokio::test]
async fn test_whoami_令牌失效清除会话() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_worker().await;

    let user = env.state.user_api.whoami().await.expect("校验令牌失败");
    assert_eq!(user.username, "worker1");

    env.backend.revoke_token("worker1");
    let err = env.state.user_api.whoami().await.expect_err("令牌失效应失败");
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert!(env.state.session.current().expect("读取会话失败").is_none());
}

// ==========================================
// 重置密码
// ==========================================

#[tokio::test]
async fn test_check_username() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    env.state
        .user_api
        .check_username("worker1")
        .await
        .expect("用户名应存在");

    let err = env
        .state
        .user_api
        .check_username("ghost1")
        .await
        .expect_err("不存在的用户名应失败");
    assert_field_error(&err, "username");

    let err = env
        .state
        .user_api
        .check_username("")
        .await
        .expect_err("空用户名应失败");
    assert_field_error(&err, "username");
}

#[tokio::test]
async fn test_reset_password_管理员重置() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_admin().await;

    let form = ResetPasswordForm {
        username: "worker1".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 5, 1),
        employee_id: "102".to_string(),
        new_password: "Fresh2026".to_string(),
        confirm_password: "Fresh2026".to_string(),
    };
    env.state
        .user_api
        .reset_password(&form, today())
        .await
        .expect("重置失败");
    assert_eq!(env.backend.password_of("worker1").as_deref(), Some("Fresh2026"));
    assert_eq!(env.logs_of(ActionType::ResetPassword).len(), 1);

    // 与当前密码相同 → 服务器拒绝, 映射到 newPassword 字段
    let err = env
        .state
        .user_api
        .reset_password(&form, today())
        .await
        .expect_err("重复密码应失败");
    assert_field_error(&err, "newPassword");
}

#[tokio::test]
async fn test_reset_password_表单校验() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_admin().await;

    let form = ResetPasswordForm {
        username: "worker1".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2030, 1, 1),
        employee_id: "12a".to_string(),
        new_password: "short".to_string(),
        confirm_password: "other".to_string(),
    };
    let err = env
        .state
        .user_api
        .reset_password(&form, today())
        .await
        .expect_err("校验应失败");
    assert_field_error(&err, "birthDate");
    assert_field_error(&err, "employeeId");
    assert_field_error(&err, "newPassword");
    assert_field_error(&err, "confirmPassword");
    assert_eq!(env.backend.count_calls("reset_password"), 0);
}

#[tokio::test]
async fn test_reset_password_需要管理员() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_worker().await;

    let err = env
        .state
        .user_api
        .reset_password(&ResetPasswordForm::default(), today())
        .await
        .expect_err("普通用户不能重置密码");
    assert!(matches!(err, ApiError::Forbidden(_)));
}

// ==========================================
// 用户管理
// ==========================================

#[tokio::test]
async fn test_create_user_角色固定为普通用户() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_admin().await;

    let created = env
        .state
        .user_api
        .create_user(&register_form())
        .await
        .expect("创建失败");
    assert_eq!(created.role, UserRole::User);
    assert_eq!(created.employee_id, 20456);

    let users = env
        .state
        .user_api
        .list_users("malee", Some(UserRole::User))
        .await
        .expect("查询失败");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "new.user1");
    assert_eq!(env.logs_of(ActionType::CreateUser).len(), 1);
}

#[tokio::test]
async fn test_create_user_校验失败() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_admin().await;

    let mut form = register_form();
    form.first_name = "M4lee".to_string();
    form.confirm_password = "Secret124".to_string();
    form.birth_date = None;

    let err = env
        .state
        .user_api
        .create_user(&form)
        .await
        .expect_err("校验应失败");
    assert_field_error(&err, "firstName");
    assert_field_error(&err, "confirmPassword");
    assert_field_error(&err, "birthDate");
    assert_eq!(env.backend.count_calls("create_user"), 0);
}

#[tokio::test]
async fn test_update_user() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_admin().await;

    let form = EditUserForm {
        name: "Anan".to_string(),
        last_name: "Chai".to_string(),
        employee_id: "777".to_string(),
        role: "admin".to_string(),
        birth_date: None,
    };
    let user = env
        .state
        .user_api
        .update_user("2", &form, today())
        .await
        .expect("修改失败");
    assert_eq!(user.name, "Anan");
    assert_eq!(user.role, UserRole::Admin);

    let bad = EditUserForm {
        role: "OWNER".to_string(),
        ..form
    };
    let err = env
        .state
        .user_api
        .update_user("2", &bad, today())
        .await
        .expect_err("未知角色应失败");
    assert_field_error(&err, "role");
}

#[tokio::test]
async fn test_delete_user_保护规则() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_admin().await;

    // 自己
    let err = env.state.user_api.delete_user("1").await.expect_err("不能删除自己");
    assert!(matches!(err, ApiError::Forbidden(_)));

    // 不存在
    let err = env.state.user_api.delete_user("99").await.expect_err("不存在应失败");
    assert!(matches!(err, ApiError::NotFound(_)));

    // 普通用户可删除
    env.state.user_api.delete_user("2").await.expect("删除失败");
    assert!(env.backend.users().iter().all(|u| u.id != "2"));
    assert_eq!(env.logs_of(ActionType::DeleteUser).len(), 1);
}

#[tokio::test]
async fn test_delete_user_不能删除管理员() {
    let backend = helpers::fake_backend::default_users(helpers::fake_backend::FakeBackend::new())
        .with_user(test_helpers::user("3", "admin2", UserRole::Admin), "Admin@456");
    let env = ApiTestEnv::with_backend(backend).expect("无法创建测试环境");
    env.login_admin().await;

    let err = env.state.user_api.delete_user("3").await.expect_err("不能删除管理员");
    assert!(matches!(err, ApiError::Forbidden(_)));
    assert_eq!(env.backend.count_calls("delete_user"), 0);
}
