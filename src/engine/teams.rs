use serde::Deserialize;
use std::collections::HashMap;

/// Which numeric identifier scheme a provider uses for teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdSpace {
    /// stats.nba.com franchise ids (1610612737..).
    NbaStats,
    /// 1..30, alphabetical by abbreviation.
    #[default]
    Balldontlie,
}

/// (abbreviation, stats.nba.com id) in alphabetical abbreviation order.
const NBA_TEAMS: [(&str, u32); 30] = [
    ("ATL", 1610612737),
    ("BOS", 1610612738),
    ("BKN", 1610612751),
    ("CHA", 1610612766),
    ("CHI", 1610612741),
    ("CLE", 1610612739),
    ("DAL", 1610612742),
    ("DEN", 1610612743),
    ("DET", 1610612765),
    ("GSW", 1610612744),
    ("HOU", 1610612745),
    ("IND", 1610612754),
    ("LAC", 1610612746),
    ("LAL", 1610612747),
    ("MEM", 1610612763),
    ("MIA", 1610612748),
    ("MIL", 1610612749),
    ("MIN", 1610612750),
    ("NOP", 1610612740),
    ("NYK", 1610612752),
    ("OKC", 1610612760),
    ("ORL", 1610612753),
    ("PHI", 1610612755),
    ("PHX", 1610612756),
    ("POR", 1610612757),
    ("SAC", 1610612758),
    ("SAS", 1610612759),
    ("TOR", 1610612761),
    ("UTA", 1610612762),
    ("WAS", 1610612764),
];

/// Static bidirectional map between team id and abbreviation.
#[derive(Debug, Clone)]
pub struct TeamTable {
    by_id: HashMap<u32, &'static str>,
    by_abbr: HashMap<&'static str, u32>,
}

impl Default for TeamTable {
    fn default() -> Self {
        Self::new(IdSpace::default())
    }
}

impl TeamTable {
    pub fn new(space: IdSpace) -> Self {
        let mut by_id = HashMap::with_capacity(NBA_TEAMS.len());
        let mut by_abbr = HashMap::with_capacity(NBA_TEAMS.len());
        for (i, (abbr, stats_id)) in NBA_TEAMS.iter().enumerate() {
            let id = match space {
                IdSpace::NbaStats => *stats_id,
                IdSpace::Balldontlie => i as u32 + 1,
            };
            by_id.insert(id, *abbr);
            by_abbr.insert(*abbr, id);
        }
        Self { by_id, by_abbr }
    }

    pub fn id_for(&self, abbr: &str) -> Option<u32> {
        let upper = abbr.trim().to_uppercase();
        self.by_abbr.get(upper.as_str()).copied()
    }

    pub fn abbr_for(&self, id: u32) -> Option<&'static str> {
        self.by_id.get(&id).copied()
    }
}

/// Canonical abbreviation for a full name, city, or abbreviation.
/// Returns None for anything that isn't one of the 30 franchises.
pub fn canonical_abbr(name: &str) -> Option<&'static str> {
    let upper = name.trim().to_uppercase();
    if let Some((abbr, _)) = NBA_TEAMS.iter().find(|(a, _)| *a == upper) {
        return Some(*abbr);
    }
    match upper.as_str() {
        "ATLANTA HAWKS" | "ATLANTA" => Some("ATL"),
        "BOSTON CELTICS" | "BOSTON" => Some("BOS"),
        "BROOKLYN NETS" | "BROOKLYN" => Some("BKN"),
        "CHARLOTTE HORNETS" | "CHARLOTTE" => Some("CHA"),
        "CHICAGO BULLS" | "CHICAGO" => Some("CHI"),
        "CLEVELAND CAVALIERS" | "CLEVELAND" => Some("CLE"),
        "DALLAS MAVERICKS" | "DALLAS" => Some("DAL"),
        "DENVER NUGGETS" | "DENVER" => Some("DEN"),
        "DETROIT PISTONS" | "DETROIT" => Some("DET"),
        "GOLDEN STATE WARRIORS" | "GOLDEN STATE" => Some("GSW"),
        "HOUSTON ROCKETS" | "HOUSTON" => Some("HOU"),
        "INDIANA PACERS" | "INDIANA" => Some("IND"),
        "LOS ANGELES CLIPPERS" | "LA CLIPPERS" => Some("LAC"),
        "LOS ANGELES LAKERS" | "LA LAKERS" => Some("LAL"),
        "MEMPHIS GRIZZLIES" | "MEMPHIS" => Some("MEM"),
        "MIAMI HEAT" | "MIAMI" => Some("MIA"),
        "MILWAUKEE BUCKS" | "MILWAUKEE" => Some("MIL"),
        "MINNESOTA TIMBERWOLVES" | "MINNESOTA" => Some("MIN"),
        "NEW ORLEANS PELICANS" | "NEW ORLEANS" => Some("NOP"),
        "NEW YORK KNICKS" | "NEW YORK" => Some("NYK"),
        "OKLAHOMA CITY THUNDER" | "OKLAHOMA CITY" => Some("OKC"),
        "ORLANDO MAGIC" | "ORLANDO" => Some("ORL"),
        "PHILADELPHIA 76ERS" | "PHILADELPHIA" => Some("PHI"),
        "PHOENIX SUNS" | "PHOENIX" => Some("PHX"),
        "PORTLAND TRAIL BLAZERS" | "PORTLAND" => Some("POR"),
        "SACRAMENTO KINGS" | "SACRAMENTO" => Some("SAC"),
        "SAN ANTONIO SPURS" | "SAN ANTONIO" => Some("SAS"),
        "TORONTO RAPTORS" | "TORONTO" => Some("TOR"),
        "UTAH JAZZ" | "UTAH" => Some("UTA"),
        "WASHINGTON WIZARDS" | "WASHINGTON" => Some("WAS"),
        _ => None,
    }
}

/// Case- and whitespace-insensitive abbreviation comparison.
pub fn same_abbr(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}
