//! The federative units of Brazil and joining region polygons, known by display name, to state groups.
use crate::aggregate::Groups;

/// Display name and two-letter code of every federative unit.
pub const STATES: [(&str, &str); 27] = [
    ("Acre", "AC"),
    ("Alagoas", "AL"),
    ("Amapá", "AP"),
    ("Amazonas", "AM"),
    ("Bahia", "BA"),
    ("Ceará", "CE"),
    ("Distrito Federal", "DF"),
    ("Espírito Santo", "ES"),
    ("Goiás", "GO"),
    ("Maranhão", "MA"),
    ("Mato Grosso", "MT"),
    ("Mato Grosso do Sul", "MS"),
    ("Minas Gerais", "MG"),
    ("Pará", "PA"),
    ("Paraíba", "PB"),
    ("Paraná", "PR"),
    ("Pernambuco", "PE"),
    ("Piauí", "PI"),
    ("Rio de Janeiro", "RJ"),
    ("Rio Grande do Norte", "RN"),
    ("Rio Grande do Sul", "RS"),
    ("Rondônia", "RO"),
    ("Roraima", "RR"),
    ("Santa Catarina", "SC"),
    ("São Paulo", "SP"),
    ("Sergipe", "SE"),
    ("Tocantins", "TO"),
];

pub fn code_for_name(name: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find_map(|(candidate, code)| (*candidate == name).then_some(*code))
}

pub fn name_for_code(code: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find_map(|(name, candidate)| (*candidate == code).then_some(*name))
}

/// `São Paulo (SP)` for `SP`, or `XX (XX)` for codes that aren't known.
pub fn full_name(code: &str) -> String {
    format!("{} ({code})", name_for_code(code).unwrap_or(code))
}

/// A region of the map with the value to color it by.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    /// `None` if the name isn't a known federative unit.
    pub code: Option<&'static str>,
    /// `None` if there is no data for the region, which is different from a value of zero.
    pub value: Option<f64>,
}

/// Join the regions of a map, known by their display name, with the state `groups` on `metric`.
pub fn choropleth<'a>(
    region_names: impl IntoIterator<Item = &'a str>,
    groups: &Groups,
    metric: &str,
) -> Vec<Region> {
    region_names
        .into_iter()
        .map(|name| {
            let code = code_for_name(name);
            Region {
                name: name.to_owned(),
                code,
                value: code.and_then(|code| groups.value(code, metric)),
            }
        })
        .collect()
}

/// The smallest and largest value among `regions`, to derive a color scale from.
pub fn value_range(regions: &[Region]) -> Option<(f64, f64)> {
    regions
        .iter()
        .filter_map(|r| r.value)
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((min, max)) => Some((f64::min(min, v), f64::max(max, v))),
        })
}
