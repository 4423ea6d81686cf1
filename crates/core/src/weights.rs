//! Static per-field multipliers applied to every match tier.

pub const DEFAULT_WEIGHT: u64 = 1;

pub const FIELD_WEIGHTS: &[(&str, u64)] = &[
    ("Razao_Social", 3),
    ("Nome_Fantasia", 3),
    ("Registro_ANS", 4),
    ("CNPJ", 4),
    ("Cidade", 2),
    ("UF", 1),
];

pub fn weight(field: &str) -> u64 {
    FIELD_WEIGHTS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, w)| *w)
        .unwrap_or(DEFAULT_WEIGHT)
}
