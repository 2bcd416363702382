#![allow(missing_docs)]

//! Edgework: the widgets and serial number on the outside of a bomb.
//!
//! Generation happens once per bomb. Everything else here is a pure query over the
//! generated widgets, and the summary string round-trips through [`FromStr`] so
//! puzzle rules can be tested against hand-written edgework.

mod serial;
mod widget;

use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::random::RandomSource;

pub use serial::SerialNumber;
pub use widget::{BatteryFilter, IndicatorCode, PortPlate, PortType, Widget, WidgetKind};

/// Number of widgets generated for every bomb.
pub const WIDGET_COUNT: usize = 5;

/// Widgets plus serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edgework {
    serial: SerialNumber,
    widgets: Vec<Widget>,
}

impl Edgework {
    /// Draw [`WIDGET_COUNT`] widgets, each kind chosen uniformly with replacement, and a
    /// serial number.
    pub fn generate(rng: &mut RandomSource) -> Self {
        let widgets = (0..WIDGET_COUNT)
            .map(|_| WidgetKind::CATALOG[rng.index(WidgetKind::CATALOG.len())].generate(rng))
            .collect();
        let serial = SerialNumber::generate(rng);
        Self { serial, widgets }
    }

    /// Assemble edgework from known parts.
    pub fn new(serial: SerialNumber, widgets: Vec<Widget>) -> Self {
        Self { serial, widgets }
    }

    pub fn serial(&self) -> &SerialNumber {
        &self.serial
    }

    /// Widgets in generation order.
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Batteries across all holders, optionally only holders with a given load.
    pub fn battery_count(&self, filter: BatteryFilter) -> u32 {
        self.holders()
            .filter(|&batteries| match filter {
                BatteryFilter::Any => true,
                BatteryFilter::PerHolder(n) => batteries == n,
            })
            .map(u32::from)
            .sum()
    }

    /// Battery holders, regardless of how many batteries each carries.
    pub fn holder_count(&self) -> usize {
        self.holders().count()
    }

    fn holders(&self) -> impl Iterator<Item = u8> + '_ {
        self.widgets.iter().filter_map(|widget| match widget {
            Widget::Battery { batteries } => Some(*batteries),
            _ => None,
        })
    }

    /// All indicators as `(code, lit)`.
    pub fn indicators(&self) -> impl Iterator<Item = (IndicatorCode, bool)> + '_ {
        self.widgets.iter().filter_map(|widget| match widget {
            Widget::Indicator { code, lit } => Some((*code, *lit)),
            _ => None,
        })
    }

    pub fn lit_indicators(&self) -> Vec<IndicatorCode> {
        self.indicators()
            .filter(|(_, lit)| *lit)
            .map(|(code, _)| code)
            .collect()
    }

    pub fn unlit_indicators(&self) -> Vec<IndicatorCode> {
        self.indicators()
            .filter(|(_, lit)| !*lit)
            .map(|(code, _)| code)
            .collect()
    }

    /// `None` when the indicator is absent, otherwise whether it is lit.
    pub fn indicator(&self, code: IndicatorCode) -> Option<bool> {
        self.indicators()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, lit)| lit)
    }

    pub fn port_plates(&self) -> impl Iterator<Item = &PortPlate> + '_ {
        self.widgets.iter().filter_map(|widget| match widget {
            Widget::PortPlate(plate) => Some(plate),
            _ => None,
        })
    }

    pub fn plate_count(&self) -> usize {
        self.port_plates().count()
    }

    /// Every port across all plates, plate by plate.
    pub fn ports(&self) -> Vec<PortType> {
        self.port_plates()
            .flat_map(|plate| plate.ports().iter().copied())
            .collect()
    }

    /// Number of ports, or of one port type when given.
    pub fn port_count(&self, port: Option<PortType>) -> usize {
        self.port_plates()
            .map(|plate| match port {
                None => plate.ports().len(),
                Some(port) => usize::from(plate.has(port)),
            })
            .sum()
    }

    /// Whether any plate carries `port`.
    pub fn has_port(&self, port: PortType) -> bool {
        self.port_count(Some(port)) > 0
    }

    pub fn has_empty_plate(&self) -> bool {
        self.port_plates().any(PortPlate::is_empty)
    }

    /// Whether the serial contains a vowel.
    pub fn has_vowel(&self) -> bool {
        self.serial.has_vowel()
    }
}

impl fmt::Display for Edgework {
    /// Twitch Plays style summary, e.g. `3B 2H // *FRK CAR // [Serial] [Empty] // KT4NE8`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |items: Vec<String>| items.join(" ");
        let sections = [
            format!(
                "{}B {}H",
                self.battery_count(BatteryFilter::Any),
                self.holder_count()
            ),
            join(
                self.indicators()
                    .map(|(code, lit)| Widget::Indicator { code, lit }.to_string())
                    .collect(),
            ),
            join(self.port_plates().map(ToString::to_string).collect()),
            self.serial.to_string(),
        ];
        let rendered: Vec<&str> = sections
            .iter()
            .map(String::as_str)
            .filter(|section| !section.is_empty())
            .collect();
        f.write_str(&rendered.join(" // "))
    }
}

/// Why an edgework summary couldn't be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EdgeworkParseError {
    #[error("edgework does not match `<n>B <n>H // ... // <serial>`")]
    Format,
    #[error("impossible combination of batteries and holders")]
    ImpossibleBatteries,
    #[error("a bomb has at most {} widgets", WIDGET_COUNT)]
    TooManyWidgets,
    #[error("malformed serial number")]
    MalformedSerial,
    #[error("ports from different groups share a plate")]
    ImpossiblePortPlate,
    #[error("unknown port")]
    NotAPort,
    #[error("unknown indicator")]
    NotAnIndicator,
}

static EDGEWORK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)B\s+(\d+)H // (?:(.*) // )?([0-9A-Z]{6})$")
        .expect("failed to compile edgework regex")
});

impl FromStr for Edgework {
    type Err = EdgeworkParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        use EdgeworkParseError::*;

        let captures = EDGEWORK_RE.captures(input.trim()).ok_or(Format)?;

        let battery_count: u32 = captures[1].parse().map_err(|_| ImpossibleBatteries)?;
        let holder_count: u32 = captures[2].parse().map_err(|_| ImpossibleBatteries)?;
        if holder_count as usize > WIDGET_COUNT {
            return Err(TooManyWidgets);
        }
        let aa_pairs = battery_count
            .checked_sub(holder_count)
            .ok_or(ImpossibleBatteries)?;
        let d_cells = holder_count
            .checked_sub(aa_pairs)
            .ok_or(ImpossibleBatteries)?;

        let serial = captures[4]
            .parse::<SerialNumber>()
            .map_err(|_| MalformedSerial)?;

        let mut widgets = Vec::new();
        widgets.extend((0..d_cells).map(|_| Widget::Battery { batteries: 1 }));
        widgets.extend((0..aa_pairs).map(|_| Widget::Battery { batteries: 2 }));

        if let Some(sections) = captures.get(3) {
            for section in sections.as_str().split(" // ") {
                if section.starts_with('[') && section.ends_with(']') {
                    for plate in section[1..section.len() - 1].split("] [") {
                        if plate == "Empty" {
                            widgets.push(Widget::PortPlate(PortPlate::empty()));
                            continue;
                        }
                        let ports = plate
                            .split(", ")
                            .map(|port| port.parse::<PortType>().map_err(|_| NotAPort))
                            .collect::<Result<Vec<_>, _>>()?;
                        let plate = PortPlate::new(ports).ok_or(ImpossiblePortPlate)?;
                        widgets.push(Widget::PortPlate(plate));
                    }
                } else {
                    for indicator in section.split(' ') {
                        let (lit, code) = match indicator.strip_prefix('*') {
                            Some(code) => (true, code),
                            None => (false, indicator),
                        };
                        let code = code.parse::<IndicatorCode>().map_err(|_| NotAnIndicator)?;
                        widgets.push(Widget::Indicator { code, lit });
                    }
                }
            }
        }

        Ok(Self { serial, widgets })
    }
}
