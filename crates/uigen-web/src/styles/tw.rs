//! Utility-class token compiler.
//!
//! Compiles the utility tokens generated components lean on (`p-4`,
//! `bg-blue-500`, `md:flex`, `hover:bg-blue-600`) into concrete CSS
//! rules. Deterministic per token, cached for repeated renders, and
//! silent about tokens it does not recognize: unknown tokens emit no
//! CSS but never fail the synthesis.
//!
//! Variant separators (`:`) inside `[...]` arbitrary values are not
//! treated as separators, so `bg-[url('/x:y.svg')]` stays one utility.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

const RULE_CACHE_LIMIT: usize = 2048;
static RULE_CACHE: OnceLock<Mutex<HashMap<String, Option<String>>>> = OnceLock::new();

/// Compile a single utility token into a CSS rule, `None` when the
/// token is unrecognized.
pub fn token_rule(token: &str) -> Option<String> {
    let cache = RULE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    if let Ok(guard) = cache.lock() {
        if let Some(cached) = guard.get(token) {
            return cached.clone();
        }
    }

    let computed = token_rule_uncached(token);

    if let Ok(mut guard) = cache.lock() {
        if guard.len() >= RULE_CACHE_LIMIT {
            guard.clear();
        }
        guard.insert(token.to_string(), computed.clone());
    }
    computed
}

/// Rank for cascade ordering: base rules first, then responsive rules
/// in breakpoint order, so wider breakpoints win.
pub fn responsive_rank(token: &str) -> u8 {
    let Some((variants, _)) = split_variants(token) else {
        return 0;
    };
    for variant in &variants {
        match variant.as_str() {
            "sm" => return 1,
            "md" => return 2,
            "lg" => return 3,
            "xl" => return 4,
            "2xl" => return 5,
            _ => {}
        }
    }
    0
}

fn token_rule_uncached(token: &str) -> Option<String> {
    let (variants, utility) = split_variants(token)?;
    let mut selector = format!(".{}", escape_class_selector(token));

    let rule = utility_rule(&utility, &selector)?;
    selector = rule.selector;

    let mut medias = Vec::new();
    for variant in &variants {
        if let Some(media) = variant_media(variant) {
            medias.push(media);
            continue;
        }
        if let Some(pseudo) = variant_pseudo(variant) {
            selector.push_str(pseudo);
            continue;
        }
        return None;
    }

    let mut out = format!("{}{{{}}}", selector, rule.declarations);
    for media in medias.into_iter().rev() {
        out = format!("@media {media}{{{out}}}");
    }
    Some(out)
}

struct Rule {
    selector: String,
    declarations: String,
}

fn rule(selector: &str, declarations: impl Into<String>) -> Option<Rule> {
    Some(Rule {
        selector: selector.to_string(),
        declarations: declarations.into(),
    })
}

/// Split a token into `(variants, utility)`, ignoring `:` inside
/// bracket expressions.
fn split_variants(token: &str) -> Option<(Vec<String>, String)> {
    let mut parts: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut depth = 0usize;

    for ch in token.chars() {
        match ch {
            '[' => {
                depth += 1;
                buf.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                buf.push(ch);
            }
            ':' if depth == 0 => {
                if buf.is_empty() {
                    return None;
                }
                parts.push(std::mem::take(&mut buf));
            }
            _ => buf.push(ch),
        }
    }
    if buf.is_empty() {
        return None;
    }
    parts.push(buf);
    let utility = parts.pop()?;
    Some((parts, utility))
}

fn variant_media(v: &str) -> Option<&'static str> {
    match v {
        "sm" => Some("(min-width: 640px)"),
        "md" => Some("(min-width: 768px)"),
        "lg" => Some("(min-width: 1024px)"),
        "xl" => Some("(min-width: 1280px)"),
        "2xl" => Some("(min-width: 1536px)"),
        _ => None,
    }
}

fn variant_pseudo(v: &str) -> Option<&'static str> {
    match v {
        "hover" => Some(":hover"),
        "focus" => Some(":focus"),
        "focus-visible" => Some(":focus-visible"),
        "focus-within" => Some(":focus-within"),
        "active" => Some(":active"),
        "disabled" => Some(":disabled"),
        "first" => Some(":first-child"),
        "last" => Some(":last-child"),
        _ => None,
    }
}

/// Resolve one utility segment (without variants) to a rule.
///
/// Prefix handlers run before the exact-token table, and structural
/// tokens (`text-center`) must resolve before the generic color
/// fallback (`text-*`) consumes them.
fn utility_rule(utility: &str, base_selector: &str) -> Option<Rule> {
    // Spacing. Longer prefixes first so `px-` never falls into `p-`.
    for (prefix, props) in [
        ("px-", &["padding-left", "padding-right"][..]),
        ("py-", &["padding-top", "padding-bottom"][..]),
        ("pt-", &["padding-top"][..]),
        ("pr-", &["padding-right"][..]),
        ("pb-", &["padding-bottom"][..]),
        ("pl-", &["padding-left"][..]),
        ("p-", &["padding"][..]),
        ("mx-", &["margin-left", "margin-right"][..]),
        ("my-", &["margin-top", "margin-bottom"][..]),
        ("mt-", &["margin-top"][..]),
        ("mr-", &["margin-right"][..]),
        ("mb-", &["margin-bottom"][..]),
        ("ml-", &["margin-left"][..]),
        ("m-", &["margin"][..]),
        ("gap-x-", &["column-gap"][..]),
        ("gap-y-", &["row-gap"][..]),
        ("gap-", &["gap"][..]),
    ] {
        if let Some(v) = utility.strip_prefix(prefix) {
            let value = if v == "auto" && prefix.starts_with('m') {
                "auto".to_string()
            } else {
                spacing_value(v)?
            };
            let decls: String = props
                .iter()
                .map(|p| format!("{p}:{value};"))
                .collect();
            return rule(base_selector, decls);
        }
    }

    if let Some(v) = utility.strip_prefix("space-y-") {
        let value = spacing_value(v)?;
        return rule(
            &format!("{base_selector} > :not([hidden]) ~ :not([hidden])"),
            format!("margin-top:{value};"),
        );
    }
    if let Some(v) = utility.strip_prefix("space-x-") {
        let value = spacing_value(v)?;
        return rule(
            &format!("{base_selector} > :not([hidden]) ~ :not([hidden])"),
            format!("margin-left:{value};"),
        );
    }

    // Sizing.
    if let Some(v) = utility.strip_prefix("w-") {
        return rule(base_selector, format!("width:{};", size_value(v, Axis::W)?));
    }
    if let Some(v) = utility.strip_prefix("h-") {
        return rule(base_selector, format!("height:{};", size_value(v, Axis::H)?));
    }
    if let Some(v) = utility.strip_prefix("min-h-") {
        return rule(
            base_selector,
            format!("min-height:{};", size_value(v, Axis::H)?),
        );
    }
    if let Some(v) = utility.strip_prefix("min-w-") {
        return rule(
            base_selector,
            format!("min-width:{};", size_value(v, Axis::W)?),
        );
    }
    if let Some(v) = utility.strip_prefix("max-w-") {
        return rule(base_selector, format!("max-width:{};", max_width_value(v)?));
    }
    if let Some(v) = utility.strip_prefix("max-h-") {
        return rule(
            base_selector,
            format!("max-height:{};", size_value(v, Axis::H)?),
        );
    }

    // Grid.
    if let Some(v) = utility.strip_prefix("grid-cols-") {
        let n = v.parse::<u32>().ok().filter(|n| *n > 0)?;
        return rule(
            base_selector,
            format!("grid-template-columns:repeat({n}, minmax(0, 1fr));"),
        );
    }
    if let Some(v) = utility.strip_prefix("col-span-") {
        let n = v.parse::<u32>().ok().filter(|n| *n > 0)?;
        return rule(base_selector, format!("grid-column:span {n} / span {n};"));
    }

    // Typography: structural `text-*` tokens before the color fallback.
    if let Some(v) = utility.strip_prefix("text-") {
        if let Some((size, line)) = text_size(v) {
            return rule(
                base_selector,
                format!("font-size:{size};line-height:{line};"),
            );
        }
        if matches!(v, "left" | "center" | "right" | "justify") {
            return rule(base_selector, format!("text-align:{v};"));
        }
        let color = color_value(v)?;
        return rule(base_selector, format!("color:{color};"));
    }

    if let Some(v) = utility.strip_prefix("leading-") {
        let value = match v {
            "none" => "1".to_string(),
            "tight" => "1.25".to_string(),
            "snug" => "1.375".to_string(),
            "normal" => "1.5".to_string(),
            "relaxed" => "1.625".to_string(),
            "loose" => "2".to_string(),
            _ => spacing_value(v)?,
        };
        return rule(base_selector, format!("line-height:{value};"));
    }

    if let Some(v) = utility.strip_prefix("tracking-") {
        let value = match v {
            "tighter" => "-0.05em",
            "tight" => "-0.025em",
            "normal" => "0",
            "wide" => "0.025em",
            "wider" => "0.05em",
            "widest" => "0.1em",
            _ => return None,
        };
        return rule(base_selector, format!("letter-spacing:{value};"));
    }

    // Backgrounds and borders.
    if let Some(v) = utility.strip_prefix("bg-") {
        let color = color_value(v)?;
        return rule(base_selector, format!("background-color:{color};"));
    }
    if let Some(v) = utility.strip_prefix("border-") {
        if let Some(width) = border_width(v) {
            return rule(base_selector, format!("border-width:{width};"));
        }
        for (edge, prop) in [
            ("t", "border-top-width"),
            ("r", "border-right-width"),
            ("b", "border-bottom-width"),
            ("l", "border-left-width"),
        ] {
            if v == edge {
                return rule(base_selector, format!("{prop}:1px;border-style:solid;"));
            }
            if let Some(rest) = v.strip_prefix(&format!("{edge}-")) {
                if let Some(width) = border_width(rest) {
                    return rule(
                        base_selector,
                        format!("{prop}:{width};border-style:solid;"),
                    );
                }
            }
        }
        let color = color_value(v)?;
        return rule(base_selector, format!("border-color:{color};"));
    }

    if let Some(v) = utility.strip_prefix("rounded-") {
        let radius = radius_value(v)?;
        return rule(base_selector, format!("border-radius:{radius};"));
    }

    if let Some(v) = utility.strip_prefix("opacity-") {
        let n = v.parse::<f64>().ok()?;
        return rule(base_selector, format!("opacity:{};", n / 100.0));
    }

    if let Some(v) = utility.strip_prefix("z-") {
        let n = v.parse::<i32>().ok()?;
        return rule(base_selector, format!("z-index:{n};"));
    }

    if let Some(v) = utility.strip_prefix("flex-") {
        // flex-col / flex-row live in the exact table.
        match v {
            "1" => return rule(base_selector, "flex:1 1 0%;"),
            "auto" => return rule(base_selector, "flex:1 1 auto;"),
            "none" => return rule(base_selector, "flex:none;"),
            _ => {}
        }
    }

    exact_utility(utility, base_selector)
}

fn exact_utility(utility: &str, s: &str) -> Option<Rule> {
    let decls: &str = match utility {
        "flex" => "display:flex;",
        "grid" => "display:grid;",
        "block" => "display:block;",
        "inline" => "display:inline;",
        "inline-block" => "display:inline-block;",
        "inline-flex" => "display:inline-flex;",
        "hidden" => "display:none;",
        "flex-col" => "flex-direction:column;",
        "flex-row" => "flex-direction:row;",
        "flex-wrap" => "flex-wrap:wrap;",
        "shrink-0" | "flex-shrink-0" => "flex-shrink:0;",
        "grow" | "flex-grow" => "flex-grow:1;",
        "items-start" => "align-items:flex-start;",
        "items-center" => "align-items:center;",
        "items-end" => "align-items:flex-end;",
        "items-stretch" => "align-items:stretch;",
        "items-baseline" => "align-items:baseline;",
        "justify-start" => "justify-content:flex-start;",
        "justify-center" => "justify-content:center;",
        "justify-end" => "justify-content:flex-end;",
        "justify-between" => "justify-content:space-between;",
        "justify-around" => "justify-content:space-around;",
        "justify-evenly" => "justify-content:space-evenly;",
        "self-start" => "align-self:flex-start;",
        "self-center" => "align-self:center;",
        "self-end" => "align-self:flex-end;",
        "rounded" => "border-radius:0.25rem;",
        "border" => "border-width:1px;border-style:solid;",
        "shadow" | "shadow-sm" => "box-shadow:0 1px 2px rgba(0,0,0,0.05);",
        "shadow-md" => "box-shadow:0 4px 12px rgba(0,0,0,0.08);",
        "shadow-lg" => "box-shadow:0 12px 32px rgba(0,0,0,0.12);",
        "shadow-xl" => "box-shadow:0 20px 48px rgba(0,0,0,0.16);",
        "shadow-none" => "box-shadow:none;",
        "font-thin" => "font-weight:100;",
        "font-light" => "font-weight:300;",
        "font-normal" => "font-weight:400;",
        "font-medium" => "font-weight:500;",
        "font-semibold" => "font-weight:600;",
        "font-bold" => "font-weight:700;",
        "font-extrabold" => "font-weight:800;",
        "font-mono" => "font-family:ui-monospace,SFMono-Regular,Menlo,monospace;",
        "font-sans" => "font-family:Inter,system-ui,sans-serif;",
        "italic" => "font-style:italic;",
        "uppercase" => "text-transform:uppercase;",
        "lowercase" => "text-transform:lowercase;",
        "capitalize" => "text-transform:capitalize;",
        "underline" => "text-decoration:underline;",
        "line-through" => "text-decoration:line-through;",
        "no-underline" => "text-decoration:none;",
        "truncate" => "overflow:hidden;text-overflow:ellipsis;white-space:nowrap;",
        "overflow-hidden" => "overflow:hidden;",
        "overflow-auto" => "overflow:auto;",
        "overflow-y-auto" => "overflow-y:auto;",
        "overflow-x-auto" => "overflow-x:auto;",
        "relative" => "position:relative;",
        "absolute" => "position:absolute;",
        "fixed" => "position:fixed;",
        "sticky" => "position:sticky;",
        "inset-0" => "top:0;right:0;bottom:0;left:0;",
        "top-0" => "top:0;",
        "right-0" => "right:0;",
        "bottom-0" => "bottom:0;",
        "left-0" => "left:0;",
        "cursor-pointer" => "cursor:pointer;",
        "cursor-not-allowed" => "cursor:not-allowed;",
        "select-none" => "user-select:none;",
        "pointer-events-none" => "pointer-events:none;",
        "transition" => {
            "transition-property:color,background-color,border-color,box-shadow,transform,opacity;transition-duration:150ms;transition-timing-function:cubic-bezier(0.4,0,0.2,1);"
        }
        "transition-colors" => {
            "transition-property:color,background-color,border-color;transition-duration:150ms;"
        }
        "transition-all" => "transition-property:all;transition-duration:150ms;",
        "duration-200" => "transition-duration:200ms;",
        "duration-300" => "transition-duration:300ms;",
        "antialiased" => "-webkit-font-smoothing:antialiased;",
        "list-none" => "list-style:none;",
        "list-disc" => "list-style-type:disc;",
        "whitespace-nowrap" => "white-space:nowrap;",
        "whitespace-pre-wrap" => "white-space:pre-wrap;",
        _ => return None,
    };
    rule(s, decls)
}

fn border_width(v: &str) -> Option<&'static str> {
    match v {
        "0" => Some("0"),
        "2" => Some("2px"),
        "4" => Some("4px"),
        "8" => Some("8px"),
        _ => None,
    }
}

fn radius_value(v: &str) -> Option<&'static str> {
    match v {
        "none" => Some("0"),
        "sm" => Some("0.125rem"),
        "md" => Some("0.375rem"),
        "lg" => Some("0.5rem"),
        "xl" => Some("0.75rem"),
        "2xl" => Some("1rem"),
        "3xl" => Some("1.5rem"),
        "full" => Some("9999px"),
        _ => None,
    }
}

fn text_size(v: &str) -> Option<(&'static str, &'static str)> {
    match v {
        "xs" => Some(("0.75rem", "1rem")),
        "sm" => Some(("0.875rem", "1.25rem")),
        "base" => Some(("1rem", "1.5rem")),
        "lg" => Some(("1.125rem", "1.75rem")),
        "xl" => Some(("1.25rem", "1.75rem")),
        "2xl" => Some(("1.5rem", "2rem")),
        "3xl" => Some(("1.875rem", "2.25rem")),
        "4xl" => Some(("2.25rem", "2.5rem")),
        "5xl" => Some(("3rem", "1")),
        "6xl" => Some(("3.75rem", "1")),
        _ => None,
    }
}

/// Spacing scale: numbers map to quarter-rem steps, `px` to one pixel,
/// `[...]` passes an arbitrary value through.
fn spacing_value(v: &str) -> Option<String> {
    if v == "px" {
        return Some("1px".to_string());
    }
    if v == "0" {
        return Some("0".to_string());
    }
    if let Some(raw) = arbitrary_value(v) {
        return Some(raw);
    }
    let parsed = v.parse::<f64>().ok()?;
    Some(format_rem(parsed * 0.25))
}

#[derive(Clone, Copy)]
enum Axis {
    W,
    H,
}

fn size_value(v: &str, axis: Axis) -> Option<String> {
    match v {
        "full" => return Some("100%".to_string()),
        "auto" => return Some("auto".to_string()),
        "min" => return Some("min-content".to_string()),
        "max" => return Some("max-content".to_string()),
        "fit" => return Some("fit-content".to_string()),
        "screen" => {
            return Some(match axis {
                Axis::W => "100vw".to_string(),
                Axis::H => "100vh".to_string(),
            })
        }
        _ => {}
    }
    if let Some(raw) = arbitrary_value(v) {
        return Some(raw);
    }
    if let Some(pct) = fraction_to_percent(v) {
        return Some(pct);
    }
    spacing_value(v)
}

fn max_width_value(v: &str) -> Option<String> {
    let fixed = match v {
        "xs" => "20rem",
        "sm" => "24rem",
        "md" => "28rem",
        "lg" => "32rem",
        "xl" => "36rem",
        "2xl" => "42rem",
        "3xl" => "48rem",
        "4xl" => "56rem",
        "5xl" => "64rem",
        "6xl" => "72rem",
        "7xl" => "80rem",
        "full" => "100%",
        "none" => "none",
        _ => return size_value(v, Axis::W),
    };
    Some(fixed.to_string())
}

fn fraction_to_percent(v: &str) -> Option<String> {
    let (num, den) = v.split_once('/')?;
    let num = num.parse::<f64>().ok()?;
    let den = den.parse::<f64>().ok().filter(|d| *d > 0.0)?;
    let pct = num / den * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        Some(format!("{}%", pct.round() as i64))
    } else {
        Some(format!("{pct:.6}%"))
    }
}

fn arbitrary_value(v: &str) -> Option<String> {
    let raw = v.strip_prefix('[')?.strip_suffix(']')?;
    if raw.is_empty() || raw.contains(['{', '}', ';']) {
        return None;
    }
    Some(raw.replace('_', " "))
}

fn format_rem(n: f64) -> String {
    if (n - n.round()).abs() < 1e-9 {
        format!("{}rem", n.round() as i64)
    } else {
        let s = format!("{n}");
        format!("{s}rem")
    }
}

const PALETTE: &[(&str, [&str; 10])] = &[
    ("slate", ["#f8fafc", "#f1f5f9", "#e2e8f0", "#cbd5e1", "#94a3b8", "#64748b", "#475569", "#334155", "#1e293b", "#0f172a"]),
    ("gray", ["#f9fafb", "#f3f4f6", "#e5e7eb", "#d1d5db", "#9ca3af", "#6b7280", "#4b5563", "#374151", "#1f2937", "#111827"]),
    ("zinc", ["#fafafa", "#f4f4f5", "#e4e4e7", "#d4d4d8", "#a1a1aa", "#71717a", "#52525b", "#3f3f46", "#27272a", "#18181b"]),
    ("red", ["#fef2f2", "#fee2e2", "#fecaca", "#fca5a5", "#f87171", "#ef4444", "#dc2626", "#b91c1c", "#991b1b", "#7f1d1d"]),
    ("orange", ["#fff7ed", "#ffedd5", "#fed7aa", "#fdba74", "#fb923c", "#f97316", "#ea580c", "#c2410c", "#9a3412", "#7c2d12"]),
    ("amber", ["#fffbeb", "#fef3c7", "#fde68a", "#fcd34d", "#fbbf24", "#f59e0b", "#d97706", "#b45309", "#92400e", "#78350f"]),
    ("yellow", ["#fefce8", "#fef9c3", "#fef08a", "#fde047", "#facc15", "#eab308", "#ca8a04", "#a16207", "#854d0e", "#713f12"]),
    ("green", ["#f0fdf4", "#dcfce7", "#bbf7d0", "#86efac", "#4ade80", "#22c55e", "#16a34a", "#15803d", "#166534", "#14532d"]),
    ("emerald", ["#ecfdf5", "#d1fae5", "#a7f3d0", "#6ee7b7", "#34d399", "#10b981", "#059669", "#047857", "#065f46", "#064e3b"]),
    ("teal", ["#f0fdfa", "#ccfbf1", "#99f6e4", "#5eead4", "#2dd4bf", "#14b8a6", "#0d9488", "#0f766e", "#115e59", "#134e4a"]),
    ("cyan", ["#ecfeff", "#cffafe", "#a5f3fc", "#67e8f9", "#22d3ee", "#06b6d4", "#0891b2", "#0e7490", "#155e75", "#164e63"]),
    ("sky", ["#f0f9ff", "#e0f2fe", "#bae6fd", "#7dd3fc", "#38bdf8", "#0ea5e9", "#0284c7", "#0369a1", "#075985", "#0c4a6e"]),
    ("blue", ["#eff6ff", "#dbeafe", "#bfdbfe", "#93c5fd", "#60a5fa", "#3b82f6", "#2563eb", "#1d4ed8", "#1e40af", "#1e3a8a"]),
    ("indigo", ["#eef2ff", "#e0e7ff", "#c7d2fe", "#a5b4fc", "#818cf8", "#6366f1", "#4f46e5", "#4338ca", "#3730a3", "#312e81"]),
    ("violet", ["#f5f3ff", "#ede9fe", "#ddd6fe", "#c4b5fd", "#a78bfa", "#8b5cf6", "#7c3aed", "#6d28d9", "#5b21b6", "#4c1d95"]),
    ("purple", ["#faf5ff", "#f3e8ff", "#e9d5ff", "#d8b4fe", "#c084fc", "#a855f7", "#9333ea", "#7e22ce", "#6b21a8", "#581c87"]),
    ("pink", ["#fdf2f8", "#fce7f3", "#fbcfe8", "#f9a8d4", "#f472b6", "#ec4899", "#db2777", "#be185d", "#9d174d", "#831843"]),
    ("rose", ["#fff1f2", "#ffe4e6", "#fecdd3", "#fda4af", "#fb7185", "#f43f5e", "#e11d48", "#be123c", "#9f1239", "#881337"]),
];

const SHADES: [&str; 10] = ["50", "100", "200", "300", "400", "500", "600", "700", "800", "900"];

fn color_value(v: &str) -> Option<String> {
    if let Some(raw) = arbitrary_value(v) {
        return Some(raw);
    }
    match v {
        "white" => return Some("#ffffff".to_string()),
        "black" => return Some("#000000".to_string()),
        "transparent" => return Some("transparent".to_string()),
        "current" => return Some("currentColor".to_string()),
        _ => {}
    }
    let (family, shade) = v.rsplit_once('-')?;
    let (_, shades) = PALETTE.iter().find(|(name, _)| *name == family)?;
    let index = SHADES.iter().position(|s| *s == shade)?;
    Some(shades[index].to_string())
}

/// Escape a class token into a valid CSS selector fragment
/// (`md:flex` -> `.md\:flex`).
fn escape_class_selector(token: &str) -> String {
    let mut out = String::new();
    for ch in token.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn spacing_tokens_compile() {
        assert_eq!(token_rule("p-4").as_deref(), Some(".p-4{padding:1rem;}"));
        assert_eq!(
            token_rule("px-2").as_deref(),
            Some(".px-2{padding-left:0.5rem;padding-right:0.5rem;}")
        );
        assert_eq!(token_rule("mt-px").as_deref(), Some(".mt-px{margin-top:1px;}"));
        assert_eq!(token_rule("mx-auto").as_deref(), Some(".mx-auto{margin-left:auto;margin-right:auto;}"));
    }

    #[test]
    fn colors_resolve_through_the_palette() {
        assert_eq!(
            token_rule("bg-blue-500").as_deref(),
            Some(".bg-blue-500{background-color:#3b82f6;}")
        );
        assert_eq!(
            token_rule("text-gray-700").as_deref(),
            Some(".text-gray-700{color:#374151;}")
        );
        assert_eq!(token_rule("bg-made-up-999"), None);
    }

    #[test]
    fn structural_text_tokens_beat_the_color_fallback() {
        assert_eq!(
            token_rule("text-center").as_deref(),
            Some(".text-center{text-align:center;}")
        );
        assert_eq!(
            token_rule("text-xl").as_deref(),
            Some(".text-xl{font-size:1.25rem;line-height:1.75rem;}")
        );
    }

    #[test]
    fn responsive_variants_wrap_in_media_queries() {
        assert_eq!(
            token_rule("md:flex").as_deref(),
            Some("@media (min-width: 768px){.md\\:flex{display:flex;}}")
        );
        assert_eq!(responsive_rank("md:flex"), 2);
        assert_eq!(responsive_rank("flex"), 0);
    }

    #[test]
    fn pseudo_variants_extend_the_selector() {
        assert_eq!(
            token_rule("hover:bg-blue-600").as_deref(),
            Some(".hover\\:bg-blue-600:hover{background-color:#2563eb;}")
        );
    }

    #[test]
    fn arbitrary_values_pass_through() {
        assert_eq!(
            token_rule("w-[32rem]").as_deref(),
            Some(".w-\\[32rem\\]{width:32rem;}")
        );
    }

    #[test]
    fn fractions_become_percentages() {
        assert_eq!(token_rule("w-1/2").as_deref(), Some(".w-1\\/2{width:50%;}"));
    }

    #[test]
    fn unknown_tokens_emit_nothing() {
        assert_eq!(token_rule("btn-primary"), None);
        assert_eq!(token_rule("tw-whatever"), None);
    }
}
