//! Edgework widgets and the catalog they are drawn from.

use std::{fmt, str::FromStr};

use crate::random::RandomSource;

/// Ports that can appear on a port plate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortType {
    Serial,
    Parallel,
    Dvi,
    Ps2,
    Rj45,
    StereoRca,
}

impl PortType {
    /// Every port type in plate order.
    pub const ALL: [PortType; 6] = [
        PortType::Serial,
        PortType::Parallel,
        PortType::Dvi,
        PortType::Ps2,
        PortType::Rj45,
        PortType::StereoRca,
    ];

    /// Ports sharing a plate must come from the same group, they won't fit otherwise.
    pub const GROUPS: [&'static [PortType]; 2] = [
        &[PortType::Serial, PortType::Parallel],
        &[
            PortType::Dvi,
            PortType::Ps2,
            PortType::Rj45,
            PortType::StereoRca,
        ],
    ];

    /// Name as printed in the edgework summary.
    pub fn label(self) -> &'static str {
        match self {
            PortType::Serial => "Serial",
            PortType::Parallel => "Parallel",
            PortType::Dvi => "DVI-D",
            PortType::Ps2 => "PS/2",
            PortType::Rj45 => "RJ-45",
            PortType::StereoRca => "Stereo RCA",
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PortType {
    type Err = ();

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized: String = input
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "serial" => Ok(PortType::Serial),
            "parallel" => Ok(PortType::Parallel),
            "dvi" | "dvid" => Ok(PortType::Dvi),
            "ps2" => Ok(PortType::Ps2),
            "rj" | "rj45" => Ok(PortType::Rj45),
            "rca" | "stereorca" => Ok(PortType::StereoRca),
            _ => Err(()),
        }
    }
}

/// Indicator labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorCode {
    Snd,
    Clr,
    Car,
    Ind,
    Frq,
    Sig,
    Nsa,
    Msa,
    Trn,
    Bob,
    Frk,
}

impl IndicatorCode {
    /// Every indicator label.
    pub const ALL: [IndicatorCode; 11] = [
        IndicatorCode::Snd,
        IndicatorCode::Clr,
        IndicatorCode::Car,
        IndicatorCode::Ind,
        IndicatorCode::Frq,
        IndicatorCode::Sig,
        IndicatorCode::Nsa,
        IndicatorCode::Msa,
        IndicatorCode::Trn,
        IndicatorCode::Bob,
        IndicatorCode::Frk,
    ];

    /// Three-letter label.
    pub fn label(self) -> &'static str {
        match self {
            IndicatorCode::Snd => "SND",
            IndicatorCode::Clr => "CLR",
            IndicatorCode::Car => "CAR",
            IndicatorCode::Ind => "IND",
            IndicatorCode::Frq => "FRQ",
            IndicatorCode::Sig => "SIG",
            IndicatorCode::Nsa => "NSA",
            IndicatorCode::Msa => "MSA",
            IndicatorCode::Trn => "TRN",
            IndicatorCode::Bob => "BOB",
            IndicatorCode::Frk => "FRK",
        }
    }
}

impl fmt::Display for IndicatorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IndicatorCode {
    type Err = ();

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.label() == input)
            .ok_or(())
    }
}

/// Filter for [`Edgework::battery_count`](super::Edgework::battery_count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatteryFilter {
    /// Every holder.
    #[default]
    Any,
    /// Holders carrying exactly this many batteries (1 for D, 2 for AA).
    PerHolder(u8),
}

/// An ordered set of ports from a single port group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPlate(Vec<PortType>);

impl PortPlate {
    /// Validate that every port belongs to one group and store them in plate order.
    pub fn new(mut ports: Vec<PortType>) -> Option<Self> {
        ports.sort_unstable();
        ports.dedup();
        let fits = PortType::GROUPS
            .iter()
            .any(|group| ports.iter().all(|port| group.contains(port)));
        fits.then_some(Self(ports))
    }

    /// A plate with no ports.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Ports on the plate.
    pub fn ports(&self) -> &[PortType] {
        &self.0
    }

    /// Whether the plate carries no ports.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `port` is present.
    pub fn has(&self, port: PortType) -> bool {
        self.0.contains(&port)
    }
}

impl fmt::Display for PortPlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("[Empty]");
        }
        let labels: Vec<&str> = self.0.iter().map(|port| port.label()).collect();
        write!(f, "[{}]", labels.join(", "))
    }
}

/// One widget on the bomb casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    /// Battery holder; a holder may carry more than one battery.
    Battery { batteries: u8 },
    /// Labelled indicator light.
    Indicator { code: IndicatorCode, lit: bool },
    /// Port plate.
    PortPlate(PortPlate),
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Widget::Battery { batteries } => write!(f, "{batteries}B"),
            Widget::Indicator { code, lit: true } => write!(f, "*{code}"),
            Widget::Indicator { code, lit: false } => write!(f, "{code}"),
            Widget::PortPlate(plate) => plate.fmt(f),
        }
    }
}

/// The kinds a widget slot is drawn from, each with its own randomiser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    BatteryHolder,
    Indicator,
    PortPlate,
}

impl WidgetKind {
    /// Catalog used for every slot.
    pub const CATALOG: [WidgetKind; 3] = [
        WidgetKind::BatteryHolder,
        WidgetKind::Indicator,
        WidgetKind::PortPlate,
    ];

    /// Build a randomised widget of this kind.
    pub fn generate(self, rng: &mut RandomSource) -> Widget {
        match self {
            WidgetKind::BatteryHolder => Widget::Battery {
                // D battery alone or a pair of AAs
                batteries: if rng.chance(0.5) { 1 } else { 2 },
            },
            WidgetKind::Indicator => Widget::Indicator {
                code: IndicatorCode::ALL[rng.index(IndicatorCode::ALL.len())],
                lit: rng.chance(0.5),
            },
            WidgetKind::PortPlate => {
                let group = PortType::GROUPS[rng.index(PortType::GROUPS.len())];
                let ports = group
                    .iter()
                    .copied()
                    .filter(|_| rng.chance(0.5))
                    .collect::<Vec<_>>();
                Widget::PortPlate(PortPlate::new(ports).unwrap_or_else(PortPlate::empty))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_plate_validation() {
        use PortType::*;
        assert!(PortPlate::new(vec![Serial, Parallel]).is_some());
        assert!(PortPlate::new(Vec::new()).is_some());
        assert!(PortPlate::new(vec![Dvi]).is_some());
        assert!(PortPlate::new(vec![Dvi, Serial]).is_none());
    }

    #[test]
    fn plates_render_in_plate_order() {
        use PortType::*;
        let plate = PortPlate::new(vec![StereoRca, Dvi]).expect("same group");
        assert_eq!(plate.to_string(), "[DVI-D, Stereo RCA]");
        assert_eq!(PortPlate::empty().to_string(), "[Empty]");
    }

    #[test]
    fn port_names_parse_leniently() {
        for (raw, port) in [
            ("Serial", PortType::Serial),
            ("DVI-D", PortType::Dvi),
            ("PS/2", PortType::Ps2),
            ("RJ", PortType::Rj45),
            ("stereo RCA", PortType::StereoRca),
        ] {
            assert_eq!(raw.parse::<PortType>(), Ok(port));
        }
        assert!("Airport".parse::<PortType>().is_err());
    }

    #[test]
    fn generated_widgets_are_well_formed() {
        let mut rng = RandomSource::seeded(99);
        for _ in 0..200 {
            for kind in WidgetKind::CATALOG {
                match kind.generate(&mut rng) {
                    Widget::Battery { batteries } => assert!((1..=2).contains(&batteries)),
                    Widget::Indicator { .. } => {}
                    Widget::PortPlate(plate) => {
                        assert!(PortPlate::new(plate.ports().to_vec()).is_some())
                    }
                }
            }
        }
    }
}
