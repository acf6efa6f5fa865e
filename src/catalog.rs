//! Lottery types and the pattern catalog the extractors run against.

use core::{fmt, str::FromStr};

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryType {
    ThaiGovernment,
    Malaysia,
    Gsb,
    Baac,
    LaoPattana,
    LaoHd,
    LaoStar,
    HanoiSpecial,
    HanoiNormal,
    HanoiVip,
}

impl LotteryType {
    pub const ALL: [Self; 10] = [
        Self::ThaiGovernment,
        Self::Malaysia,
        Self::Gsb,
        Self::Baac,
        Self::LaoPattana,
        Self::LaoHd,
        Self::LaoStar,
        Self::HanoiSpecial,
        Self::HanoiNormal,
        Self::HanoiVip,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::ThaiGovernment => "thai_government",
            Self::Malaysia => "malaysia",
            Self::Gsb => "gsb",
            Self::Baac => "baac",
            Self::LaoPattana => "lao_pattana",
            Self::LaoHd => "lao_hd",
            Self::LaoStar => "lao_star",
            Self::HanoiSpecial => "hanoi_special",
            Self::HanoiNormal => "hanoi_normal",
            Self::HanoiVip => "hanoi_vip",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::ThaiGovernment => "หวยรัฐบาลไทย",
            Self::Malaysia => "หวยมาเลย์",
            Self::Gsb => "หวยออมสิน",
            Self::Baac => "หวย ธ.ก.ส.",
            Self::LaoPattana => "หวยลาวพัฒนา",
            Self::LaoHd => "หวยลาว HD",
            Self::LaoStar => "หวยลาวสตาร์",
            Self::HanoiSpecial => "หวยฮานอยพิเศษ",
            Self::HanoiNormal => "หวยฮานอยปกติ",
            Self::HanoiVip => "หวยฮานอย VIP",
        }
    }

    /// Drawn several times a day; only these carry a draw time.
    pub const fn is_timed(self) -> bool {
        matches!(self, Self::HanoiSpecial | Self::HanoiNormal | Self::HanoiVip)
    }

    /// Digits in the headline result number.
    pub const fn full_width(self) -> usize {
        match self {
            Self::ThaiGovernment | Self::Gsb | Self::Baac | Self::LaoHd | Self::LaoStar => 6,
            Self::Malaysia | Self::LaoPattana => 4,
            Self::HanoiSpecial | Self::HanoiNormal | Self::HanoiVip => 3,
        }
    }
}

impl fmt::Display for LotteryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLotteryType(pub String);

impl fmt::Display for UnknownLotteryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown lottery type {:?}", self.0)
    }
}

impl core::error::Error for UnknownLotteryType {}

impl FromStr for LotteryType {
    type Err = UnknownLotteryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLotteryType(s.to_owned()))
    }
}

pub const SECTION_MARKER: &str = "ผลหวย";

const RESULTS_LABEL: &str = r"ผลรางวัล(?:ที่\s*1)?";
const TOP3_LABEL: &str = r"(?:3\s*ตัวบน|สามตัวบน)";
const BOTTOM2_LABEL: &str = r"(?:2\s*ตัวล่าง|สองตัวล่าง)";
const TIMED_HEADING: &str = "ฮานอย";

/// How far past a label a value may sit, in characters.
const LABEL_SPAN: usize = 60;
/// Upper bound on a multi-draw variant's window, in characters.
pub const TIMED_WINDOW: usize = 300;

#[rustfmt::skip]
const SECTIONS: [(LotteryType, &str); 7] = [
    (LotteryType::ThaiGovernment, r"รัฐบาลไทย|สลากกินแบ่งรัฐบาล"),
    (LotteryType::Malaysia, r"มาเลย์|มาเลเซีย"),
    (LotteryType::Gsb, r"ออมสิน"),
    (LotteryType::Baac, r"ธ\.\s*ก\.\s*ส\.?|ธกส"),
    (LotteryType::LaoPattana, r"ลาวพัฒนา"),
    (LotteryType::LaoHd, r"ลาว\s*(?i:hd)"),
    (LotteryType::LaoStar, r"ลาวสตาร์|ลาว\s*(?i:star)"),
];

#[rustfmt::skip]
const TIMED: [(LotteryType, &str, &str); 3] = [
    (LotteryType::HanoiSpecial, r"ฮานอย\s*พิเศษ", "17:00"),
    (LotteryType::HanoiNormal, r"ฮานอย\s*ปกติ", "18:30"),
    (LotteryType::HanoiVip, r"ฮานอย\s*(?i:vip)", "19:30"),
];

/// Matches an exactly `width`-digit run that follows `label` within [`LABEL_SPAN`] characters.
pub fn value_near(label: &str, width: usize) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"{label}(?:(?s:.){{0,{LABEL_SPAN}}}?\D)?(\d{{{width}}})(?:\D|$)"
    ))
}

#[derive(Debug, Clone)]
pub struct LotteryDef {
    pub lottery_type: LotteryType,
    pub detect: Regex,
    pub full: Regex,
}

#[derive(Debug, Clone)]
pub struct TimedDef {
    pub lottery_type: LotteryType,
    pub name: Regex,
    pub default_time: &'static str,
}

/// Immutable pattern set shared by the text and DOM extractors.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub section_marker: &'static str,
    pub lotteries: Vec<LotteryDef>,
    pub timed_heading: &'static str,
    pub timed: Vec<TimedDef>,
    pub top3: Regex,
    pub bottom2: Regex,
}

impl Catalog {
    pub fn builtin() -> Result<Self, regex::Error> {
        let lotteries = SECTIONS
            .iter()
            .map(|&(lottery_type, detect)| {
                Ok(LotteryDef {
                    lottery_type,
                    detect: Regex::new(detect)?,
                    full: value_near(RESULTS_LABEL, lottery_type.full_width())?,
                })
            })
            .collect::<Result<_, regex::Error>>()?;

        let timed = TIMED
            .iter()
            .map(|&(lottery_type, name, default_time)| {
                Ok(TimedDef {
                    lottery_type,
                    name: Regex::new(name)?,
                    default_time,
                })
            })
            .collect::<Result<_, regex::Error>>()?;

        Ok(Self {
            section_marker: SECTION_MARKER,
            lotteries,
            timed_heading: TIMED_HEADING,
            timed,
            top3: value_near(TOP3_LABEL, 3)?,
            bottom2: value_near(BOTTOM2_LABEL, 2)?,
        })
    }

    /// First catalog entry whose detection pattern hits `section`.
    pub fn detect(&self, section: &str) -> Option<&LotteryDef> {
        self.lotteries.iter().find(|def| def.detect.is_match(section))
    }

    pub fn detect_count(&self, section: &str) -> usize {
        self.lotteries
            .iter()
            .filter(|def| def.detect.is_match(section))
            .count()
    }
}
