// ==========================================
// 配方库存核对系统 - 数值输入解析
// ==========================================
// 规则: 输入框文本一律"解析失败即 0"，不报错
// - "12kg" → 12（取最长合法数字前缀）
// - "abc" / "" → 0
// - "1,250.5" → 1250.5（仅 parse_quantity 去除千分位逗号）
// ==========================================

/// 取字符串最长的合法浮点数前缀并解析；没有前缀时返回 0
pub fn parse_or_zero(raw: &str) -> f64 {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return 0.0;
    }

    // 指数部分只有在后面跟着数字时才算数
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    match s[..end].parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// 用量类输入: 先去掉千分位逗号再解析
pub fn parse_quantity(raw: &str) -> f64 {
    parse_or_zero(&raw.replace(',', ""))
}

/// 解析失败或结果为 0 时回退到默认值（批数默认 1，百分比默认 100）
pub fn parse_or_default(raw: &str, default: f64) -> f64 {
    let v = parse_or_zero(raw);
    if v == 0.0 {
        default
    } else {
        v
    }
}

/// 输入框是否有内容（用于必填校验）
pub fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}
