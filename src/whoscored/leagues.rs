//! Static catalog of supported competitions.

use crate::error::{Result, ScrapeError};

/// How a competition labels its seasons in the site's season dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonFormat {
    /// "2025"
    CalendarYear,
    /// "2024/2025"
    SplitYear,
    /// Split seasons except for the listed calendar-year editions.
    SplitExcept(&'static [i32]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct League {
    pub name: &'static str,
    /// Tournament index page, relative to the site base URL.
    pub path: &'static str,
    pub format: SeasonFormat,
}

impl League {
    pub fn season_label(&self, year: i32) -> String {
        let calendar = match self.format {
            SeasonFormat::CalendarYear => true,
            SeasonFormat::SplitYear => false,
            SeasonFormat::SplitExcept(years) => years.contains(&year),
        };
        if calendar {
            year.to_string()
        } else {
            format!("{}/{}", year - 1, year)
        }
    }

    pub fn index_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path)
    }
}

use SeasonFormat::{CalendarYear, SplitYear};

pub const LEAGUES: &[League] = &[
    League {
        name: "EPL",
        path: "/Regions/252/Tournaments/2/England-Premier-League",
        format: SplitYear,
    },
    League {
        name: "La Liga",
        path: "/Regions/206/Tournaments/4/Spain-LaLiga",
        format: SplitYear,
    },
    League {
        name: "Bundesliga",
        path: "/Regions/81/Tournaments/3/Germany-Bundesliga",
        format: SplitYear,
    },
    League {
        name: "Serie A",
        path: "/Regions/108/Tournaments/5/Italy-Serie-A",
        format: SplitYear,
    },
    League {
        name: "Ligue 1",
        path: "/Regions/74/Tournaments/22/France-Ligue-1",
        format: SplitYear,
    },
    League {
        name: "Argentina Liga Profesional",
        path: "/Regions/11/Tournaments/68/Argentina-Liga-Profesional",
        format: SeasonFormat::SplitExcept(&[2016, 2021]),
    },
    League {
        name: "EFL Championship",
        path: "/Regions/252/Tournaments/7/England-Championship",
        format: SplitYear,
    },
    League {
        name: "EFL1",
        path: "/Regions/252/Tournaments/8/England-League-One",
        format: SplitYear,
    },
    League {
        name: "EFL2",
        path: "/Regions/252/Tournaments/9/England-League-Two",
        format: SplitYear,
    },
    League {
        name: "Liga Nos",
        path: "/Regions/177/Tournaments/21/Portugal-Liga-NOS",
        format: SplitYear,
    },
    League {
        name: "Eredivisie",
        path: "/Regions/155/Tournaments/13/Netherlands-Eredivisie",
        format: SplitYear,
    },
    League {
        name: "Russian Premier League",
        path: "/Regions/182/Tournaments/77/Russia-Premier-League",
        format: SplitYear,
    },
    League {
        name: "Brasileirao",
        path: "/Regions/31/Tournaments/95/Brazil-Brasileir%C3%A3o",
        format: CalendarYear,
    },
    League {
        name: "MLS",
        path: "/Regions/233/Tournaments/85/USA-Major-League-Soccer",
        format: CalendarYear,
    },
    League {
        name: "Super Lig",
        path: "/Regions/225/Tournaments/17/Turkey-Super-Lig",
        format: SplitYear,
    },
    League {
        name: "Jupiler Pro League",
        path: "/Regions/22/Tournaments/18/Belgium-Jupiler-Pro-League",
        format: SplitYear,
    },
    League {
        name: "Bundesliga II",
        path: "/Regions/81/Tournaments/6/Germany-Bundesliga-II",
        format: SplitYear,
    },
    League {
        name: "Champions League",
        path: "/Regions/250/Tournaments/12/Europe-Champions-League",
        format: SplitYear,
    },
    League {
        name: "Europa League",
        path: "/Regions/250/Tournaments/30/Europe-Europa-League",
        format: SplitYear,
    },
    League {
        name: "FA Cup",
        path: "/Regions/252/Tournaments/29/England-League-Cup",
        format: SplitYear,
    },
    League {
        name: "League Cup",
        path: "/Regions/252/Tournaments/29/England-League-Cup",
        format: SplitYear,
    },
    League {
        name: "World Cup",
        path: "/Regions/247/Tournaments/36/International-FIFA-World-Cup",
        format: CalendarYear,
    },
    League {
        name: "European Championship",
        path: "/Regions/247/Tournaments/124/International-European-Championship",
        format: CalendarYear,
    },
    League {
        name: "AFCON",
        path: "/Regions/247/Tournaments/104/International-Africa-Cup-of-Nations",
        format: CalendarYear,
    },
];

pub fn find_league(name: &str) -> Result<&'static League> {
    LEAGUES
        .iter()
        .find(|l| l.name == name)
        .ok_or_else(|| ScrapeError::UnknownLeague(name.to_string()))
}
