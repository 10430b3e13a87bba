// ==========================================
// 配方库存核对系统 - 命令行入口
// ==========================================
// 用法: fsc <子命令> [参数]
// 日志写 stderr; 命令结果写 stdout
// ==========================================

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use formula_stock_checker::api::{ApiError, ApiResult, EditUserForm, RegisterForm, ResetPasswordForm};
use formula_stock_checker::app::{get_default_db_path, AppState};
use formula_stock_checker::domain::{
    AdjustmentBook, Department, DraftLine, FormulaDraft, PlanForm, Remark, UserRole,
};
use formula_stock_checker::engine::{format_lot, RecordFilter};
use formula_stock_checker::i18n::{t, t_with_args};
use formula_stock_checker::logging;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "fsc", version, about = "Formula & stock checker for production planning")]
struct Cli {
    /// 本地数据库路径（默认: 用户数据目录）
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// 输出 debug 日志（含 HTTP 请求/响应）
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 日志输出为 JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 登录并保存会话
    Login {
        username: String,
        #[arg(long)]
        password: String,
        /// 使用管理员入口
        #[arg(long)]
        admin: bool,
    },
    /// 清除本地会话
    Logout,
    /// 校验令牌并显示当前用户
    Whoami,
    #[command(subcommand)]
    Stock(StockCmd),
    #[command(subcommand)]
    Formula(FormulaCmd),
    #[command(subcommand)]
    Plan(PlanCmd),
    #[command(subcommand)]
    Records(RecordsCmd),
    #[command(subcommand)]
    Users(UsersCmd),
    #[command(subcommand)]
    Config(ConfigCmd),
    #[command(subcommand)]
    Log(LogCmd),
}

#[derive(Subcommand, Debug)]
enum StockCmd {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    /// 手工入/出库
    Update {
        code: String,
        #[arg(long = "in", default_value = "")]
        in_amount: String,
        #[arg(long = "out", default_value = "")]
        out_amount: String,
    },
    /// 上传库存文件（.xlsx/.xls/.csv/.json）
    Upload { path: PathBuf },
    /// 库存告警; 指定 --export 时写出 CSV 报表
    Alerts {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum FormulaCmd {
    List {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        remark: Option<String>,
    },
    Show { code: String },
    /// 新建或覆盖配方; --line CODE:NAME:USE 可重复
    Save {
        #[arg(long)]
        code: String,
        #[arg(long)]
        remark: String,
        #[arg(long = "line", required = true)]
        lines: Vec<String>,
    },
    Delete {
        #[arg(long)]
        code: String,
        #[arg(long)]
        remark: String,
    },
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    code: String,
    #[arg(long)]
    remark: Option<String>,
    #[arg(long, default_value = "")]
    lot: String,
    #[arg(long, default_value = "")]
    percent: String,
    /// YYYY-MM-DD
    #[arg(long)]
    date: Option<String>,
    /// 入库调整 CODE=KG, 可重复
    #[arg(long = "in")]
    in_adjustments: Vec<String>,
    /// 出库调整 CODE=KG, 可重复
    #[arg(long = "out")]
    out_adjustments: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum PlanCmd {
    Check(PlanArgs),
    Submit(PlanArgs),
}

#[derive(Args, Debug)]
struct FilterArgs {
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> RecordFilter {
        RecordFilter::new(&self.search, self.from.as_deref(), self.to.as_deref())
    }
}

#[derive(Subcommand, Debug)]
enum RecordsCmd {
    List(FilterArgs),
    Stats(FilterArgs),
    EditLot { id: String, lot: f64 },
    Delete { id: String },
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum UsersCmd {
    List {
        #[arg(long, default_value = "")]
        search: String,
        /// ADMIN / USER
        #[arg(long)]
        role: Option<String>,
    },
    CheckUsername { username: String },
    Create {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        employee_id: String,
    },
    Update {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        employee_id: String,
        #[arg(long)]
        role: String,
        #[arg(long)]
        birth_date: Option<String>,
    },
    Delete { id: String },
    ResetPassword {
        username: String,
        #[arg(long)]
        birth_date: Option<String>,
        #[arg(long)]
        employee_id: String,
        #[arg(long)]
        new_password: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCmd {
    Get { key: String },
    Set { key: String, value: String },
    Reset { key: String },
    List,
}

#[derive(Subcommand, Debug)]
enum LogCmd {
    Recent {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

// ==========================================
// 参数解析辅助
// ==========================================

fn parse_date(field: &str, raw: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::field(field, format!("Invalid date (YYYY-MM-DD): {}", s))),
    }
}

fn parse_department(raw: Option<&str>) -> ApiResult<Option<Department>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<Department>()
            .map(Some)
            .map_err(|e| ApiError::field("department", e)),
    }
}

fn parse_role(raw: Option<&str>) -> ApiResult<Option<UserRole>> {
    match raw.map(|s| s.trim().to_uppercase()) {
        None => Ok(None),
        Some(s) if s == "ADMIN" => Ok(Some(UserRole::Admin)),
        Some(s) if s == "USER" => Ok(Some(UserRole::User)),
        Some(s) => Err(ApiError::field("role", format!("Unknown role: {}", s))),
    }
}

fn plan_inputs(args: &PlanArgs) -> ApiResult<(PlanForm, AdjustmentBook)> {
    let form = PlanForm {
        department: parse_department(args.department.as_deref())?,
        color_code: args.code.clone(),
        remark: args.remark.as_deref().and_then(Remark::parse),
        lot_input: args.lot.clone(),
        percent_input: args.percent.clone(),
        date: parse_date("date", args.date.as_deref())?,
    };

    let mut book = AdjustmentBook::new();
    for (raw, inbound) in args
        .in_adjustments
        .iter()
        .map(|r| (r, true))
        .chain(args.out_adjustments.iter().map(|r| (r, false)))
    {
        let (code, amount) = raw
            .split_once('=')
            .ok_or_else(|| ApiError::InvalidInput(format!("调整格式应为 CODE=KG: {}", raw)))?;
        if inbound {
            book.set_in(code.trim(), amount);
        } else {
            book.set_out(code.trim(), amount);
        }
    }
    Ok((form, book))
}

fn draft_line(raw: &str) -> ApiResult<DraftLine> {
    let parts: Vec<&str> = raw.splitn(3, ':').collect();
    match parts.as_slice() {
        [code, name, chemical_use] => Ok(DraftLine {
            chemical_code: code.trim().to_string(),
            name: name.trim().to_string(),
            chemical_use: chemical_use.trim().to_string(),
        }),
        _ => Err(ApiError::InvalidInput(format!("配方行格式应为 CODE:NAME:USE: {}", raw))),
    }
}

fn print_json<T: Serialize>(value: &T) -> ApiResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// ==========================================
// 命令执行
// ==========================================

async fn run(state: &AppState, command: Command) -> ApiResult<()> {
    let today = chrono::Local::now().date_naive();

    match command {
        Command::Login {
            username,
            password,
            admin,
        } => {
            let session = if admin {
                state.user_api.admin_login(&username, &password).await?
            } else {
                state.user_api.login(&username, &password).await?
            };
            println!("{} ({})", session.user.display_name(), session.user.role);
        }
        Command::Logout => {
            state.user_api.logout()?;
            println!("{}", t("common.success"));
        }
        Command::Whoami => print_json(&state.user_api.whoami().await?)?,

        // ===== 原料库存 =====
        Command::Stock(StockCmd::List { search }) => {
            for row in state.stock_api.list(search.as_deref()).await? {
                println!(
                    "{:<16} prev={:>12.2} in={:>10.2} out={:>10.2} total={:>12.2}",
                    row.code, row.previous_total, row.latest_in, row.latest_out, row.total
                );
            }
        }
        Command::Stock(StockCmd::Update {
            code,
            in_amount,
            out_amount,
        }) => {
            let adj = state.stock_api.update(&code, &in_amount, &out_amount).await?;
            print_json(&adj)?;
        }
        Command::Stock(StockCmd::Upload { path }) => {
            let outcome = state.stock_api.upload(&path).await?;
            println!(
                "{}: {} ({} rows, {} codes); stock now {} rows",
                t("common.uploaded"),
                outcome.summary.file_name,
                outcome.summary.row_count,
                outcome.summary.distinct_codes,
                outcome.stock.len()
            );
        }
        Command::Stock(StockCmd::Alerts { search, export }) => match export {
            Some(dir) => {
                let path = state.stock_api.export_alerts(search.as_deref(), &dir).await?;
                println!("{}", path.display());
            }
            None => {
                let report = state.stock_api.alerts(search.as_deref()).await?;
                for item in &report.items {
                    println!(
                        "{:>4}. {:<16} {:>12.2}  {}",
                        item.no,
                        item.code,
                        item.total,
                        t(item.level.message_key())
                    );
                }
                println!("TOTAL ALERTS: {}", report.summary.total());
            }
        },

        // ===== 配方 =====
        Command::Formula(FormulaCmd::List { code, remark }) => {
            let remark = remark.as_deref().and_then(Remark::parse);
            let lines = match code {
                Some(code) => state.formula_api.filter(&code, remark.as_ref()).await?,
                None => state.formula_api.list().await?,
            };
            print_json(&lines)?;
        }
        Command::Formula(FormulaCmd::Show { code }) => {
            print_json(&state.formula_api.details(&code).await?)?
        }
        Command::Formula(FormulaCmd::Save {
            code,
            remark,
            lines,
        }) => {
            let mut draft = FormulaDraft::new(&code, Remark::parse(&remark));
            draft.lines = lines.iter().map(|l| draft_line(l)).collect::<ApiResult<_>>()?;
            let batch = state.formula_api.create(&draft).await?;
            println!("{}: {} ({})", t("common.saved"), batch.color_code, batch.remarks);
        }
        Command::Formula(FormulaCmd::Delete { code, remark }) => {
            let remark = Remark::parse(&remark);
            state
                .formula_api
                .delete_formula(&code, remark.as_ref())
                .await?;
            println!("{}", t("common.deleted"));
        }

        // ===== 生产计划 =====
        Command::Plan(PlanCmd::Check(args)) => {
            let (form, book) = plan_inputs(&args)?;
            let check = state.plan_api.check(&form, &book).await?;
            let low_kg = format_lot(state.settings.low_remaining_after_use_kg);
            for c in check.notices() {
                let message = match c.notice.message_key() {
                    Some("notice.low_after_use") => t_with_args(
                        "notice.low_after_use",
                        &[("kg", low_kg.as_str())],
                    ),
                    Some(key) => t(key),
                    None => continue,
                };
                println!("{:<16} {}", c.chemical_code, message);
            }
            print_json(&check)?;
        }
        Command::Plan(PlanCmd::Submit(args)) => {
            let (form, book) = plan_inputs(&args)?;
            let check = state.plan_api.submit(&form, &book).await?;
            println!("{} ({:.2}%)", t("common.submitted"), check.actual_percent);
        }

        // ===== 计划记录 =====
        Command::Records(RecordsCmd::List(args)) => {
            for r in state.record_api.filter(&args.to_filter()).await? {
                println!(
                    "{:<10} {:<6} {:<16} lot={:<6} {}",
                    r.id,
                    r.department,
                    r.color_code,
                    format_lot(r.lot),
                    r.date_key()
                );
            }
        }
        Command::Records(RecordsCmd::Stats(args)) => {
            print_json(&state.record_api.stats(&args.to_filter()).await?)?
        }
        Command::Records(RecordsCmd::EditLot { id, lot }) => {
            let change = state.record_api.edit_lot(&id, lot).await?;
            println!(
                "lot {} -> {} ({} adjustments)",
                format_lot(change.old_lot),
                format_lot(change.new_lot),
                change.adjustments.len()
            );
        }
        Command::Records(RecordsCmd::Delete { id }) => {
            let returned = state.record_api.delete(&id).await?;
            println!("{} ({} returned)", t("common.deleted"), returned.len());
        }
        Command::Records(RecordsCmd::Export { filter, dir }) => {
            let path = state.record_api.export(&filter.to_filter(), &dir).await?;
            println!("{}", path.display());
        }

        // ===== 用户管理 =====
        Command::Users(UsersCmd::List { search, role }) => {
            let role = parse_role(role.as_deref())?;
            print_json(&state.user_api.list_users(&search, role).await?)?;
        }
        Command::Users(UsersCmd::CheckUsername { username }) => {
            state.user_api.check_username(&username).await?;
            println!("{}", t("common.success"));
        }
        Command::Users(UsersCmd::Create {
            username,
            password,
            confirm,
            first_name,
            last_name,
            birth_date,
            employee_id,
        }) => {
            let form = RegisterForm {
                username,
                password,
                confirm_password: confirm,
                first_name,
                last_name,
                birth_date: parse_date("birthDate", birth_date.as_deref())?,
                employee_id,
            };
            let created = state.user_api.create_user(&form).await?;
            println!("{}: {}", t("common.success"), created.username);
        }
        Command::Users(UsersCmd::Update {
            id,
            name,
            last_name,
            employee_id,
            role,
            birth_date,
        }) => {
            let form = EditUserForm {
                name,
                last_name,
                employee_id,
                role,
                birth_date: parse_date("birthDate", birth_date.as_deref())?,
            };
            print_json(&state.user_api.update_user(&id, &form, today).await?)?;
        }
        Command::Users(UsersCmd::Delete { id }) => {
            state.user_api.delete_user(&id).await?;
            println!("{}", t("common.deleted"));
        }
        Command::Users(UsersCmd::ResetPassword {
            username,
            birth_date,
            employee_id,
            new_password,
            confirm,
        }) => {
            state.user_api.check_username(&username).await?;
            let form = ResetPasswordForm {
                username,
                birth_date: parse_date("birthDate", birth_date.as_deref())?,
                employee_id,
                new_password,
                confirm_password: confirm,
            };
            state.user_api.reset_password(&form, today).await?;
            println!("{}", t("common.success"));
        }

        // ===== 配置 =====
        Command::Config(ConfigCmd::Get { key }) => {
            let entry = state.config_api.get_config(&key)?;
            println!("{} = {}{}", entry.key, entry.value, if entry.is_default { " (default)" } else { "" });
        }
        Command::Config(ConfigCmd::Set { key, value }) => {
            state
                .config_api
                .update_config(&key, &value, &state.session.actor())?;
            println!("{}", t("common.saved"));
        }
        Command::Config(ConfigCmd::Reset { key }) => {
            state.config_api.reset_config(&key, &state.session.actor())?;
            println!("{}", t("common.success"));
        }
        Command::Config(ConfigCmd::List) => {
            for entry in state.config_api.list_configs()? {
                println!("{} = {}{}", entry.key, entry.value, if entry.is_default { " (default)" } else { "" });
            }
        }

        // ===== 操作日志 =====
        Command::Log(LogCmd::Recent { limit }) => {
            for log in state.action_log_repo.find_recent(limit)? {
                println!(
                    "{}  {:<14} {:<12} {}",
                    log.action_ts.format("%Y-%m-%d %H:%M:%S"),
                    log.action_type,
                    log.actor,
                    log.color_code.unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_with(cli.verbose, cli.log_json);

    tracing::debug!("{} v{}", formula_stock_checker::APP_NAME, formula_stock_checker::VERSION);

    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);

    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("初始化失败: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&state, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let resp = err.to_response();
            eprintln!("[{}] {}", resp.code, resp.message);
            if let ApiError::ValidationError { violations, .. } = &err {
                for v in violations {
                    eprintln!("  - {}: {}", v.field, v.message);
                }
            }
            ExitCode::FAILURE
        }
    }
}
