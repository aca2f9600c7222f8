//! Energy provider registry
//!
//! The Enever feeds quote prices per provider using short codes embedded in
//! the response field names (`prijsZP`, `prijsEZ`, ...). The set of codes is
//! fixed; the empty code is the raw exchange price. The EGSI/EOD entries are
//! gas-only exchange quotes, and the exchange/Tibber entries have no gas
//! tariff.

/// All known provider codes and display names
pub const PROVIDERS: &[(&str, &str)] = &[
    ("", "Beursprijs"),
    ("AA", "Atoom Alliantie"),
    ("AIP", "All in power"),
    ("ANWB", "ANWB Energie"),
    ("BE", "Budget Energie"),
    ("EE", "EasyEnergy"),
    ("EN", "Eneco"),
    ("EVO", "Energie VanOns"),
    ("EZ", "EnergyZero"),
    ("FR", "Frank Energie"),
    ("GSL", "Groenestroom Lokaal"),
    ("MDE", "Mijndomein Energie"),
    ("NE", "NextEnergy"),
    ("TI", "Tibber"),
    ("VDB", "Vandebron"),
    ("VON", "Vrij op naam"),
    ("WE", "Wout Energie"),
    ("ZG", "ZonderGas"),
    ("ZP", "Zonneplan"),
    ("EGSI", "Beursprijs EGSI"),
    ("EOD", "Beursprijs EOD"),
];

/// Check if a provider code is known
pub fn is_known(code: &str) -> bool {
    PROVIDERS.iter().any(|(key, _)| *key == code)
}

/// Check if a provider publishes electricity price data
pub fn supports_electricity(code: &str) -> bool {
    is_known(code) && !matches!(code, "EGSI" | "EOD")
}

/// Check if a provider publishes gas price data
pub fn supports_gas(code: &str) -> bool {
    is_known(code) && !matches!(code, "" | "TI")
}

/// All provider codes with electricity price data
pub fn electricity_keys() -> Vec<&'static str> {
    PROVIDERS
        .iter()
        .map(|(key, _)| *key)
        .filter(|key| supports_electricity(key))
        .collect()
}

/// All provider codes with gas price data
pub fn gas_keys() -> Vec<&'static str> {
    PROVIDERS
        .iter()
        .map(|(key, _)| *key)
        .filter(|key| supports_gas(key))
        .collect()
}

/// Display name for a provider code, or the code itself if unknown
pub fn display_name(code: &str) -> &str {
    PROVIDERS
        .iter()
        .find(|(key, _)| *key == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}
