// ==========================================
// 配方库存核对系统 - 表单校验器
// ==========================================
// 职责: 登录 / 注册 / 重置密码 / 编辑用户 表单规则
// 输出: 逐字段 FieldViolation, 每个字段只报第一条违规
// ==========================================

use crate::api::error::{ApiError, ApiResult, FieldViolation};
use crate::domain::types::UserRole;
use chrono::NaiveDate;

pub const USERNAME_RULE: &str =
    "3–30 chars, start with a letter, end with letter/number, no consecutive _ . -";

fn is_username_symbol(c: char) -> bool {
    matches!(c, '.' | '_' | '-')
}

/// 用户名: 3–30 字符, 字母开头, 字母或数字结尾, 仅 [A-Za-z0-9._-], 符号不连续
pub fn is_valid_username(username: &str) -> bool {
    let chars: Vec<char> = username.chars().collect();
    if chars.len() < 3 || chars.len() > 30 {
        return false;
    }
    let (Some(first), Some(last)) = (chars.first(), chars.last()) else {
        return false;
    };
    if !first.is_ascii_alphabetic() || !last.is_ascii_alphanumeric() {
        return false;
    }
    if !chars
        .iter()
        .all(|c| c.is_ascii_alphanumeric() || is_username_symbol(*c))
    {
        return false;
    }
    !chars
        .windows(2)
        .any(|w| is_username_symbol(w[0]) && is_username_symbol(w[1]))
}

/// 姓名: 英文字母开头, 之后允许字母、空白、撇号、连字符
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '\'' || c == '-')
}

pub fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// 密码规则; 返回第一条违规消息
pub fn password_violation(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        Some("Password is required")
    } else if !password.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some("Password must contain English letters (A–Z, a–z) or digits (0–9) only")
    } else if password.chars().count() < 8 {
        Some("Password must be at least 8 characters")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("Password must contain at least one number")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("Password must contain at least one uppercase letter")
    } else {
        None
    }
}

fn confirm_violation(password: &str, confirm: &str) -> Option<&'static str> {
    if confirm.is_empty() {
        Some("Please confirm your password")
    } else if !confirm.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some("Confirm password must use English letters or digits only")
    } else if password != confirm {
        Some("Passwords do not match")
    } else {
        None
    }
}

fn name_violation(label: &str, value: &str) -> Option<String> {
    if value.trim().is_empty() {
        Some(format!("{} is required", label))
    } else if !is_valid_name(value.trim()) {
        Some(format!("{} must be English letters only", label))
    } else {
        None
    }
}

fn employee_id_violation(value: &str) -> Option<&'static str> {
    if value.trim().is_empty() {
        Some("Employee ID is required")
    } else if !is_digits(value.trim()) {
        Some("Employee ID must be digits only")
    } else {
        None
    }
}

fn finish(violations: Vec<FieldViolation>) -> ApiResult<()> {
    match ApiError::from_violations(violations) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// ==========================================
// 登录
// ==========================================

/// 普通用户登录: 用户名须符合规则, 密码非空
pub fn validate_login(username: &str, password: &str) -> ApiResult<()> {
    let mut v = Vec::new();
    if username.trim().is_empty() {
        v.push(FieldViolation::new("username", "Username is required"));
    } else if !is_valid_username(username.trim()) {
        v.push(FieldViolation::new("username", USERNAME_RULE));
    }
    if password.is_empty() {
        v.push(FieldViolation::new("password", "Password is required"));
    }
    finish(v)
}

/// 管理员登录: 只要求非空
pub fn validate_admin_login(username: &str, password: &str) -> ApiResult<()> {
    let mut v = Vec::new();
    if username.trim().is_empty() {
        v.push(FieldViolation::new("username", "Username is required"));
    }
    if password.is_empty() {
        v.push(FieldViolation::new("password", "Password is required"));
    }
    finish(v)
}

// ==========================================
// 注册（管理员创建用户）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub employee_id: String,
}

pub fn validate_register(form: &RegisterForm) -> ApiResult<()> {
    let mut v = Vec::new();

    if let Some(msg) = name_violation("First name", &form.first_name) {
        v.push(FieldViolation::new("firstName", msg));
    }
    if let Some(msg) = name_violation("Last name", &form.last_name) {
        v.push(FieldViolation::new("lastName", msg));
    }
    if form.username.trim().is_empty() {
        v.push(FieldViolation::new("username", "Username is required"));
    } else if !is_valid_username(form.username.trim()) {
        v.push(FieldViolation::new("username", USERNAME_RULE));
    }
    if form.birth_date.is_none() {
        v.push(FieldViolation::new("birthDate", "Birth date is required"));
    }
    if let Some(msg) = employee_id_violation(&form.employee_id) {
        v.push(FieldViolation::new("employeeId", msg));
    }
    if let Some(msg) = password_violation(&form.password) {
        v.push(FieldViolation::new("password", msg));
    }
    if let Some(msg) = confirm_violation(&form.password, &form.confirm_password) {
        v.push(FieldViolation::new("confirmPassword", msg));
    }

    finish(v)
}

// ==========================================
// 重置密码（第二步）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ResetPasswordForm {
    pub username: String,
    pub birth_date: Option<NaiveDate>,
    pub employee_id: String,
    pub new_password: String,
    pub confirm_password: String,
}

pub fn validate_reset(form: &ResetPasswordForm, today: NaiveDate) -> ApiResult<()> {
    let mut v = Vec::new();

    match form.birth_date {
        None => v.push(FieldViolation::new("birthDate", "Birth date is required")),
        Some(d) if d > today => v.push(FieldViolation::new(
            "birthDate",
            "Birth date cannot be in the future",
        )),
        Some(_) => {}
    }
    if let Some(msg) = employee_id_violation(&form.employee_id) {
        v.push(FieldViolation::new("employeeId", msg));
    }

    let pw = &form.new_password;
    let pw_msg = if pw.is_empty() {
        Some("New password is required")
    } else if let Some(msg) = password_violation(pw) {
        Some(msg)
    } else if pw.to_lowercase() == form.username.trim().to_lowercase() {
        Some("Password must not be the same as your username")
    } else if pw == form.employee_id.trim() {
        Some("Password must not be the same as your employee ID")
    } else {
        None
    };
    if let Some(msg) = pw_msg {
        v.push(FieldViolation::new("newPassword", msg));
    }

    if form.confirm_password.is_empty() {
        v.push(FieldViolation::new(
            "confirmPassword",
            "Please confirm your password",
        ));
    } else if form.confirm_password != form.new_password {
        v.push(FieldViolation::new("confirmPassword", "Passwords do not match"));
    }

    finish(v)
}

// ==========================================
// 编辑用户
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct EditUserForm {
    pub name: String,
    pub last_name: String,
    pub employee_id: String,
    pub role: String,
    pub birth_date: Option<NaiveDate>,
}

/// 校验并返回解析后的角色
pub fn validate_edit_user(form: &EditUserForm, today: NaiveDate) -> ApiResult<UserRole> {
    let mut v = Vec::new();

    if form.name.trim().is_empty() {
        v.push(FieldViolation::new("name", "First name is required"));
    }
    if form.last_name.trim().is_empty() {
        v.push(FieldViolation::new("lastName", "Last name is required"));
    }
    if let Some(msg) = employee_id_violation(&form.employee_id) {
        v.push(FieldViolation::new("employeeId", msg));
    }
    let role = match form.role.trim().to_uppercase().as_str() {
        "ADMIN" => Some(UserRole::Admin),
        "USER" => Some(UserRole::User),
        _ => {
            v.push(FieldViolation::new("role", "Role must be ADMIN or USER"));
            None
        }
    };
    if let Some(d) = form.birth_date {
        if d > today {
            v.push(FieldViolation::new(
                "birthDate",
                "Birth date cannot be in the future",
            ));
        }
    }

    finish(v)?;
    role.ok_or_else(|| ApiError::field("role", "Role must be ADMIN or USER"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violations(err: ApiError) -> Vec<(String, String)> {
        match err {
            ApiError::ValidationError { violations, .. } => violations
                .into_iter()
                .map(|v| (v.field, v.message))
                .collect(),
            other => panic!("Expected ValidationError, got {other:?}"),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_username_rule() {
        for ok in ["abc", "somchai.k", "a_b-c1", "A12", &"a".repeat(30)] {
            assert!(is_valid_username(ok), "{ok} should be valid");
        }
        for bad in [
            "ab",
            "1abc",
            "abc.",
            "a..b",
            "a._b",
            "ab c",
            "สมชาย",
            &"a".repeat(31),
        ] {
            assert!(!is_valid_username(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_name_rule() {
        assert!(is_valid_name("Mary-Jane O'Neil"));
        assert!(!is_valid_name("-Mary"));
        assert!(!is_valid_name("Mary2"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn test_password_rules_in_order() {
        assert_eq!(password_violation("abc$1234A"), Some("Password must contain English letters (A–Z, a–z) or digits (0–9) only"));
        assert_eq!(password_violation("Ab1"), Some("Password must be at least 8 characters"));
        assert_eq!(password_violation("Abcdefgh"), Some("Password must contain at least one number"));
        assert_eq!(password_violation("abcdefg1"), Some("Password must contain at least one uppercase letter"));
        assert_eq!(password_violation("Abcdefg1"), None);
    }

    #[test]
    fn test_login_validation() {
        assert!(validate_login("somchai", "x").is_ok());
        let v = violations(validate_login("1bad", "").unwrap_err());
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].1, USERNAME_RULE);

        assert!(validate_admin_login("1bad", "x").is_ok());
        assert!(validate_admin_login("  ", "x").is_err());
    }

    #[test]
    fn test_register_validation() {
        let mut form = RegisterForm {
            username: "anan.b".to_string(),
            password: "Secret123".to_string(),
            confirm_password: "Secret123".to_string(),
            first_name: "Anan".to_string(),
            last_name: "Boon".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1),
            employee_id: "501".to_string(),
        };
        assert!(validate_register(&form).is_ok());

        form.employee_id = "50A".to_string();
        form.confirm_password = "Secret124".to_string();
        form.first_name = "Anan2".to_string();
        let v = violations(validate_register(&form).unwrap_err());
        let fields: Vec<&str> = v.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["firstName", "employeeId", "confirmPassword"]);
    }

    #[test]
    fn test_reset_validation() {
        let mut form = ResetPasswordForm {
            username: "Somchai".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1),
            employee_id: "12345678".to_string(),
            new_password: "Newpass12".to_string(),
            confirm_password: "Newpass12".to_string(),
        };
        assert!(validate_reset(&form, today()).is_ok());

        form.birth_date = NaiveDate::from_ymd_opt(2025, 6, 2);
        form.new_password = "SOMCHAI1".to_string();
        form.username = "somchai1".to_string();
        form.confirm_password = "SOMCHAI1".to_string();
        let v = violations(validate_reset(&form, today()).unwrap_err());
        assert_eq!(v[0], ("birthDate".to_string(), "Birth date cannot be in the future".to_string()));
        assert_eq!(v[1].1, "Password must not be the same as your username");
    }

    #[test]
    fn test_edit_user_validation() {
        let form = EditUserForm {
            name: "Anan".to_string(),
            last_name: "Boon".to_string(),
            employee_id: "77".to_string(),
            role: "admin".to_string(),
            birth_date: None,
        };
        assert_eq!(validate_edit_user(&form, today()).unwrap(), UserRole::Admin);

        let bad = EditUserForm {
            role: "ROOT".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2030, 1, 1),
            ..form
        };
        let v = violations(validate_edit_user(&bad, today()).unwrap_err());
        let fields: Vec<&str> = v.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["role", "birthDate"]);
    }
}
