//! Static bank-name lookups: logo URLs and short English display names.
//!
//! Pure functions over fixed tables; nothing here touches the network.

const BANK_LOGOS: &[(&str, &str)] = &[
    ("Universal bank", "https://universalbank.uz/_nuxt/img/logo.af9d595.svg"),
    ("BRB", "https://brb.uz/assets/logo/korotkii-logotip-brb.svg"),
    ("Octobank", "https://octobank.uz/assets/all_images/ab-logo.svg"),
    ("Anorbank", "https://anorbank.uz/images/logo.svg"),
    ("Hamkorbank", "https://hamkorbank.uz/assets/images/static/logo.svg"),
    ("Ipak Yuli Bank", "https://ipakyulibank.uz/images/iyb_logo_v2.svg"),
    ("Infinbank", "https://infinbank.com/upload/icons/full-logo.svg"),
    ("Asia Alliance Bank", "https://aab.uz/bitrix/templates/main_2022/ab/images/header-logo.svg"),
    ("O‘zbekiston Milliy banki", "https://nbu.uz/assets/theme/nbu-logo.svg"),
    ("KDB Bank Uzbekiston", "https://kdb.uz/img/navbar/KDB-logo.svg"),
    ("Orient Finans Bank", "https://ofb.uz/upload/images/logo.svg"),
    ("Asakabank", "https://asakabank.uz/images/logo_animate.svg"),
    ("Trastbank", "https://trastbank.uz/bitrix/templates/main_2020/tb/img/footer__logo.svg"),
    ("O‘zsanoatqurilishbank", "https://sqb.uz/local/templates/sqb/img/SQB-Logo-main.svg"),
    ("APEXBANK", "https://apexbank.uz/local/templates/main/assets/images/logo.svg"),
    ("Xalq Banki", "https://xb.uz/_next/static/media/logo.9f2ead73.svg"),
    // Aliases
    ("OFB", "https://ofb.uz/upload/images/logo.svg"),
    ("SQB", "https://sqb.uz/local/templates/sqb/img/SQB-Logo-main.svg"),
    ("Asaka Bank", "https://asakabank.uz/images/logo_animate.svg"),
    ("NBU", "https://nbu.uz/assets/theme/nbu-logo.svg"),
    ("Ipak Yuli", "https://ipakyulibank.uz/images/iyb_logo_v2.svg"),
    ("Milliy bank", "https://nbu.uz/assets/theme/nbu-logo.svg"),
    ("Sanoatqurilishbank", "https://sqb.uz/local/templates/sqb/img/SQB-Logo-main.svg"),
];

const BANK_DOMAINS: &[(&str, &str)] = &[
    ("Hayot Bank", "hayotbank.uz"),
    ("Garant bank", "garantbank.uz"),
    ("Turon bank", "turonbank.uz"),
    ("Poytaxt bank", "poytaxtbank.uz"),
    ("Ipoteka bank", "ipotekabank.uz"),
    ("Saderat Bank", "saderatbank.uz"),
    ("Ziraat Bank", "ziraatbank.uz"),
    ("MKBank", "mikrokreditbank.uz"),
    ("Aloqabank", "aloqabank.uz"),
    ("Tenge Bank", "tengebank.uz"),
    ("Agrobank", "agrobank.uz"),
    ("Kapitalbank", "kapitalbank.uz"),
];

const TRANSLATIONS: &[(&str, &str)] = &[
    ("O'zsanoatqurilishbank", "Uzsanoat Bank"),
    ("Ozsanoatqurilishbank", "Uzsanoat Bank"),
    ("O'zbekiston Milliy Banki", "Nat'l Bank UZ"),
    ("Ozbekiston Milliy Banki", "Nat'l Bank UZ"),
    ("Xalq Banki", "Xalq Bank"),
    ("Orient Finans Bank", "Orient Finans"),
    ("Noshashuvchan", "Sustainable"),
    ("Konstruktor", "Constructor"),
    ("AVO omonati", "AVO Deposit"),
    ("Nostashuvchan omonati: kunlik foizlar", "Sustainable Deposit"),
];

/// Names already short and recognisable in English.
const KEEP_AS_IS: &[&str] = &[
    "avo bank", "uzum bank", "turon bank", "asakabank", "ipak yuli", "kapitalbank", "hamkorbank",
    "anor bank", "tenge bank", "nbu", "aloqabank",
];

const SHORT_NAME_MAX: usize = 16;

const CLEARBIT: &str = "https://logo.clearbit.com";

/// Substring match in either direction, ignoring case. Very short keys
/// (`OFB`, `SQB`) would match unrelated names, so both sides need 4+ chars.
fn fuzzy_eq(key: &str, name: &str) -> bool {
    if key.chars().count() <= 3 || name.chars().count() <= 3 {
        return false;
    }
    let (key, name) = (key.to_lowercase(), name.to_lowercase());
    key.contains(&name) || name.contains(&key)
}

/// Logo URL for a bank, or an empty string when unknown.
pub fn bank_logo(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    if let Some((_, url)) = BANK_LOGOS.iter().find(|(k, _)| *k == name) {
        return url.to_string();
    }
    if let Some((_, domain)) = BANK_DOMAINS.iter().find(|(k, _)| *k == name) {
        return format!("{CLEARBIT}/{domain}");
    }
    if let Some((_, url)) = BANK_LOGOS.iter().find(|(k, _)| fuzzy_eq(k, name)) {
        return url.to_string();
    }
    BANK_DOMAINS
        .iter()
        .find(|(k, _)| fuzzy_eq(k, name))
        .map(|(_, domain)| format!("{CLEARBIT}/{domain}"))
        .unwrap_or_default()
}

/// Short English display name for a bank or deposit product.
pub fn short_name(name: &str) -> String {
    if let Some((_, en)) = TRANSLATIONS.iter().find(|(uz, _)| *uz == name) {
        return en.to_string();
    }
    let lower = name.to_lowercase();
    if let Some((_, en)) = TRANSLATIONS.iter().find(|(uz, _)| {
        let uz = uz.to_lowercase();
        !lower.is_empty() && (lower.contains(&uz) || uz.contains(&lower))
    }) {
        return en.to_string();
    }

    let mut name = name.to_string();
    if lower.contains("milliy") || lower.contains("miliy") {
        if ["zbekiston", "o'zbekiston", "ozbekiston", "\u{2018}zbekiston"]
            .iter()
            .any(|w| lower.contains(w))
        {
            return "Nat'l Bank UZ".to_string();
        }
        name = name
            .replace("Milliy Banki", "Nat'l Bank")
            .replace("milliy banki", "Nat'l Bank");
    }
    if lower.contains("sanoatqurili") {
        return "Uzsanoat Bank".to_string();
    }
    if KEEP_AS_IS.iter().any(|k| lower.contains(k)) {
        return name;
    }

    if name.chars().count() > SHORT_NAME_MAX {
        if lower.contains("bank") {
            let parts: Vec<&str> = name.split_whitespace().collect();
            if let Some(i) = parts.iter().position(|p| p.to_lowercase().contains("bank")) {
                let core = parts[..=i].join(" ");
                if core.chars().count() <= SHORT_NAME_MAX {
                    return core;
                }
            }
        }
        let head: String = name.chars().take(13).collect();
        return format!("{head}...");
    }
    name
}
