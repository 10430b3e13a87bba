// ==========================================
// PlanApi 集成测试
// ==========================================
// 测试范围:
// 1. 数据加载与精确检索
// 2. 核对: 提示等级、实际百分比、入出库调整
// 3. 提交: 登录守卫、必填项、缺料拦截、成功后回写库存
// 4. 并发刷新: 被覆盖的旧响应不写入缓存
// ==========================================

mod helpers;

use chrono::NaiveDate;
use formula_stock_checker::api::ApiError;
use formula_stock_checker::domain::{
    ActionType, AdjustmentBook, Department, IngredientNotice, PlanForm, Remark,
};
use helpers::api_test_helper::*;
use test_helpers::stock_row;

fn form(color_code: &str, remark: Option<Remark>, lot: &str) -> PlanForm {
    PlanForm {
        department: Some(Department::C1),
        color_code: color_code.to_string(),
        remark,
        lot_input: lot.to_string(),
        percent_input: "100".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 10, 19),
    }
}

// ==========================================
// 加载与检索
// ==========================================

#[tokio::test]
async fn test_load_返回配方与库存() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let data = env.state.plan_api.load().await.expect("加载失败");
    assert_eq!(data.formulas.len(), 4);
    assert_eq!(data.stock.len(), 4);
    assert_eq!(env.backend.count_calls("fetch_formulas"), 1);
    assert_eq!(env.backend.count_calls("fetch_stock"), 1);
}

#[tokio::test]
async fn test_refresh_stock_旧响应晚到被丢弃() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.plan_api;
    let release = env.backend.hold_next("fetch_stock");

    let stale = async { api.refresh_stock().await };
    let fresh = async {
        tokio::task::yield_now().await;
        env.backend.replace_stock(vec![stock_row("CH-A", 42.0)]);
        let rows = api.refresh_stock().await;
        let _ = release.send(());
        rows
    };
    let (stale, fresh) = tokio::join!(stale, fresh);

    let fresh = fresh.expect("刷新失败");
    assert_eq!(fresh.len(), 1);
    // 先发出的请求拿到的是旧库存, 但返回的是已采纳的最新数据
    let stale = stale.expect("刷新失败");
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].total, 42.0);

    let data = api.load().await.expect("加载失败");
    assert_eq!(data.stock.len(), 1);
}

#[tokio::test]
async fn test_load_库存被后续刷新覆盖() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let api = &env.state.plan_api;
    let release = env.backend.hold_next("fetch_stock");

    let load = async { api.load().await };
    let refresh = async {
        tokio::task::yield_now().await;
        env.backend.replace_stock(vec![stock_row("CH-A", 42.0), stock_row("CH-B", 7.0)]);
        let rows = api.refresh_stock().await;
        let _ = release.send(());
        rows
    };
    let (data, rows) = tokio::join!(load, refresh);

    assert_eq!(rows.expect("刷新失败").len(), 2);
    let data = data.expect("加载失败");
    assert_eq!(data.formulas.len(), 4);
    assert_eq!(data.stock.len(), 2);
    assert_eq!(env.backend.count_calls("fetch_stock"), 2);

    let check = api
        .check(&form("RED-01", Some(Remark::Syn), "1"), &AdjustmentBook::new())
        .await
        .expect("核对失败");
    assert_eq!(check.ingredients[0].balance, 42.0);
}

#[tokio::test]
async fn test_search_产品代码区分大小写() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let lines = env
        .state
        .plan_api
        .search("RED-01", Some(&Remark::Syn))
        .await
        .expect("检索失败");
    assert_eq!(lines.len(), 2);

    let all_remarks = env.state.plan_api.search("RED-01", None).await.expect("检索失败");
    assert_eq!(all_remarks.len(), 3);

    let lower = env.state.plan_api.search("red-01", None).await.expect("检索失败");
    assert!(lower.is_empty());
}

#[tokio::test]
async fn test_search_复用缓存() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    env.state.plan_api.load().await.expect("加载失败");
    env.state.plan_api.search("BLUE-02", None).await.expect("检索失败");
    env.state.plan_api.search("RED-01", None).await.expect("检索失败");

    assert_eq!(env.backend.count_calls("fetch_formulas"), 1);
}

// ==========================================
// 核对
// ==========================================

#[tokio::test]
async fn test_check_库存充足但剩余偏低() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let check = env
        .state
        .plan_api
        .check(&form("RED-01", Some(Remark::Syn), "2"), &AdjustmentBook::new())
        .await
        .expect("核对失败");

    assert!(!check.has_shortfall);
    assert_eq!(check.actual_percent, 100.0);

    let ch_a = check.ingredients.iter().find(|c| c.chemical_code == "CH-A").expect("缺少 CH-A");
    assert_eq!(ch_a.use_amount, 200.0);
    assert_eq!(ch_a.diff, 4800.0);
    assert_eq!(ch_a.notice, IngredientNotice::None);

    let ch_b = check.ingredients.iter().find(|c| c.chemical_code == "CH-B").expect("缺少 CH-B");
    assert_eq!(ch_b.use_amount, 100.0);
    assert_eq!(ch_b.notice, IngredientNotice::LowAfterUse);

    let notices: Vec<&str> = check.notices().map(|c| c.chemical_code.as_str()).collect();
    assert_eq!(notices, vec!["CH-B"]);
}

#[tokio::test]
async fn test_check_缺货原料() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let check = env
        .state
        .plan_api
        .check(&form("RED-01", Some(Remark::Pi1), "1"), &AdjustmentBook::new())
        .await
        .expect("核对失败");

    assert!(check.has_shortfall);
    assert_eq!(check.actual_percent, 0.0);
    assert_eq!(check.ingredients[0].notice, IngredientNotice::NoRemaining);
    let limiting = check.limiting.expect("应有限制原料");
    assert_eq!(limiting.chemical_code, "CH-C");
}

#[tokio::test]
async fn test_check_入库调整改变结果() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let f = form("RED-01", Some(Remark::Pi1), "1");

    // 入库 10kg, 需要 20kg → 只能生产 50%
    let mut book = AdjustmentBook::new();
    book.set_in("CH-C", "10");
    let check = env.state.plan_api.check(&f, &book).await.expect("核对失败");
    assert_eq!(check.ingredients[0].notice, IngredientNotice::Partial);
    assert_eq!(check.actual_percent, 50.0);
    assert!(check.has_shortfall);

    // 入库 30kg, 出库 abc(按 0) → 足够
    book.set_in("CH-C", "30");
    book.set_out("CH-C", "abc");
    let check = env.state.plan_api.check(&f, &book).await.expect("核对失败");
    assert!(!check.has_shortfall);
    assert_eq!(check.ingredients[0].available, 30.0);
    assert_eq!(check.ingredients[0].notice, IngredientNotice::LowAfterUse);
}

#[tokio::test]
async fn test_check_批数与百分比默认值() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let mut f = form("BLUE-02", Some(Remark::Syn), "");
    f.percent_input = "0".to_string();

    let check = env
        .state
        .plan_api
        .check(&f, &AdjustmentBook::new())
        .await
        .expect("核对失败");
    assert_eq!(check.request.lot_count, 1.0);
    assert_eq!(check.request.target_percent, 100.0);
    assert_eq!(check.ingredients[0].use_amount, 10.0);
}

// ==========================================
// 提交
// ==========================================

#[tokio::test]
async fn test_submit_未登录() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    let err = env
        .state
        .plan_api
        .submit(&form("RED-01", Some(Remark::Syn), "1"), &AdjustmentBook::new())
        .await
        .expect_err("未登录应失败");
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert_eq!(env.backend.count_calls("submit_plan"), 0);
}

#[tokio::test]
async fn test_submit_必填项缺失() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_worker().await;

    let f = PlanForm {
        color_code: "RED-01".to_string(),
        lot_input: "1".to_string(),
        ..PlanForm::default()
    };
    let err = env
        .state
        .plan_api
        .submit(&f, &AdjustmentBook::new())
        .await
        .expect_err("缺少必填项应失败");

    assert_field_error(&err, "department");
    assert_field_error(&err, "percent");
    assert_field_error(&err, "date");
    assert_field_error(&err, "remark");
}

#[tokio::test]
async fn test_submit_原料不足禁止提交() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_worker().await;

    let err = env
        .state
        .plan_api
        .submit(&form("RED-01", Some(Remark::Pi1), "1"), &AdjustmentBook::new())
        .await
        .expect_err("缺料应失败");

    match err {
        ApiError::InsufficientStock { codes } => assert_eq!(codes, vec!["CH-C".to_string()]),
        other => panic!("期望 InsufficientStock, 实际: {:?}", other),
    }
    assert_eq!(env.backend.count_calls("submit_plan"), 0);
}

#[tokio::test]
async fn test_submit_未知产品代码() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_worker().await;

    let err = env
        .state
        .plan_api
        .submit(&form("GREEN-99", Some(Remark::Syn), "1"), &AdjustmentBook::new())
        .await
        .expect_err("无配方应失败");
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_submit_成功后回写库存并记录日志() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_worker().await;

    let mut book = AdjustmentBook::new();
    book.set_in("CH-B", "300");
    let check = env
        .state
        .plan_api
        .submit(&form("RED-01", Some(Remark::Syn), "2"), &book)
        .await
        .expect("提交失败");
    assert!(!check.has_shortfall);

    let submissions = env.backend.submissions();
    assert_eq!(submissions.len(), 1);
    let s = &submissions[0];
    assert_eq!(s.department, "C1");
    assert_eq!(s.date, "2026-10-19");
    assert_eq!(s.remarks, "Syn.");
    assert_eq!(s.lot, 2.0);
    assert_eq!(s.updates.len(), 2);

    // CH-A: 5000 - 200; CH-B: 700 + 300 - 100
    assert_eq!(env.backend.total_of("CH-A"), Some(4800.0));
    assert_eq!(env.backend.total_of("CH-B"), Some(900.0));

    // 提交后刷新库存
    let cached = env.state.plan_api.refresh_stock().await.expect("刷新失败");
    assert!(cached.iter().any(|r| r.code == "CH-A" && r.total == 4800.0));

    let logs = env.logs_of(ActionType::SubmitPlan);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].actor, "worker1");
    assert_eq!(logs[0].color_code.as_deref(), Some("RED-01"));
}

#[tokio::test]
async fn test_submit_后端不可达() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.login_worker().await;
    env.backend.set_offline(true);

    let err = env
        .state
        .plan_api
        .submit(&form("RED-01", Some(Remark::Syn), "1"), &AdjustmentBook::new())
        .await
        .expect_err("离线应失败");
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(err.code(), "NETWORK_ERROR");
}
