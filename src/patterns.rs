//! Pattern rule tables.
//!
//! Every table maps a key to an ordered list of compiled patterns. Order is
//! priority: the first pattern that yields an acceptable capture wins and
//! later patterns are only consulted when earlier ones fail. The tables are
//! compiled once per process and never mutated.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};

use crate::model::{Attribute, Field, Section};

/// Separators that may follow a label: ASCII or full-width colon.
const COLON: &str = r"[：:]";

/// Month-precision date as written in resumes: `2015-09`, `2015.9`,
/// `2015年9月`, `2015/09`.
const DATE_TOKEN: &str = r"\d{4}[ \t]*[-./年][ \t]*\d{1,2}(?:[ \t]*月)?";

/// Open-ended range terminators.
const PRESENT_TOKEN: &str = r"至今|现在|目前|今|present|now";

const FIELD_RULES: &[(Field, &[&str])] = &[
    (
        Field::Name,
        &[r"姓\s*名[：:]\s*([^\s]+)", r"姓名\s*([^\s]+)", r"^([^\s]{2,4})\s*$"],
    ),
    (Field::Gender, &[r"性\s*别[：:]\s*([男女])", r"性别\s*([男女])"]),
    (
        Field::Age,
        &[r"年\s*龄[：:]\s*(\d+)", r"年龄\s*(\d+)", r"(\d+)\s*岁"],
    ),
    (
        Field::PoliticalAffiliation,
        &[r"政治面貌[：:]\s*([^\s]+)", r"政治面貌\s*([^\s]+)"],
    ),
    (
        Field::Weight,
        &[
            r"体\s*重[：:]\s*(\d+(?:\.\d+)?)\s*(?:公斤|kg)?",
            r"(\d+(?:\.\d+)?)\s*(?:公斤|kg)",
        ],
    ),
    (
        Field::Hometown,
        &[
            r"籍\s*贯[：:]\s*([^\s]+)",
            r"籍贯\s*([^\s]+)",
            r"出生地[：:]\s*([^\s]+)",
        ],
    ),
    (
        Field::HealthStatus,
        &[r"健康状况[：:]\s*([^\s]+)", r"健康\s*([^\s]+)"],
    ),
    (
        Field::Height,
        &[
            r"身\s*高[：:]\s*(\d+(?:\.\d+)?)\s*(?:厘米|cm)?",
            r"(\d+(?:\.\d+)?)\s*(?:厘米|cm)",
        ],
    ),
    (
        Field::EducationLevel,
        &[
            r"学\s*历[：:]\s*([^\s]+)",
            r"学历\s*([^\s]+)",
            r"(博士|硕士|本科|大专|专科|高中|初中)",
        ],
    ),
    (
        Field::GraduatingInstitution,
        &[
            r"毕业院校[：:]\s*([^\s|]+)",
            r"院校[：:]\s*([^\s|]+)",
            r"毕业院校\s+([^\s|]+)",
            r"([^\s|]*(?:大学|学院|职业学院|技术学院)[^\s|]*)",
        ],
    ),
    (
        Field::Major,
        &[
            r"专\s*业[：:]\s*([^\s]+)",
            r"专业\s*([^\s]+)",
            r"专业方向[：:]\s*([^\s]+)",
        ],
    ),
    (
        Field::JobTarget,
        &[
            r"求职意向[：:]\s*([^\s|]+)",
            r"意向职位[：:]\s*([^\s|]+)",
            r"应聘职位[：:]\s*([^\s|]+)",
            r"求职意向\s+([^\s|]+)",
        ],
    ),
    (
        Field::Phone,
        &[
            r"手\s*机[：:]\s*(1[3-9]\d[-\s]?\d{4}[-\s]?\d{4})",
            r"电话[：:]\s*(1[3-9]\d[-\s]?\d{4}[-\s]?\d{4})",
            r"联系电话[：:]\s*(1[3-9]\d[-\s]?\d{4}[-\s]?\d{4})",
            r"手机\s+(1[3-9]\d[-\s]?\d{4}[-\s]?\d{4})",
            r"(1[3-9]\d[-\s]?\d{4}[-\s]?\d{4})",
        ],
    ),
    (
        Field::Email,
        &[
            r"邮\s*箱[：:]\s*([^\s]+@[^\s]+)",
            r"邮箱\s*([^\s]+@[^\s]+)",
            r"([^\s]+@[^\s]+\.[^\s]+)",
        ],
    ),
];

const SECTION_ALIASES: &[(Section, &[&str])] = &[
    (
        Section::Education,
        &["教育经历", "教育背景", "学习经历", "教育情况"],
    ),
    (
        Section::Honors,
        &["荣誉奖项", "获奖情况", "奖项荣誉", "荣誉证书"],
    ),
    (
        Section::Certifications,
        &["技能证书", "专业技能", "技能水平", "证书情况", "资格证书"],
    ),
    (
        Section::Employment,
        &["工作经历", "工作经验", "职业经历", "实习经历", "项目经验"],
    ),
    (
        Section::Hobbies,
        &["兴趣爱好", "个人爱好", "业余爱好", "特长爱好"],
    ),
    (
        Section::SelfAssessment,
        &["自我评价", "个人评价", "自我介绍", "个人简介", "个人总结"],
    ),
];

/// Labels that introduce an entry attribute value on the same line.
const ATTRIBUTE_LABELS: &[(Attribute, &str)] = &[
    (Attribute::School, r"学\s*校|毕业院校|就读院校|school"),
    (Attribute::Degree, r"学\s*历|学\s*位|degree"),
    (Attribute::Major, r"专\s*业|major"),
    (Attribute::Company, r"公\s*司|单\s*位|company|employer"),
    (Attribute::Position, r"职\s*位|岗\s*位|职\s*务|position"),
    (
        Attribute::Responsibilities,
        r"主要职责|工作职责|工作内容|responsibilities",
    ),
];

/// Unlabeled keyword fallbacks, consulted only inside time-anchor windows.
const ATTRIBUTE_KEYWORDS: &[(Attribute, &[&str])] = &[
    (
        Attribute::School,
        &[r"([^\s|,，;；:：]*(?:大学|学院|university|college))"],
    ),
    (
        Attribute::Degree,
        &[r"(博士研究生|硕士研究生|博士|硕士|本科|大专|专科|中专|高中|bachelor|master|ph\.?d)"],
    ),
    (
        Attribute::Company,
        &[r"([^\s|,，;；:：]*(?:有限公司|公司|集团|研究院|研究所|事务所|银行|医院|inc\.?|ltd\.?|corp\.?))"],
    ),
    (
        Attribute::Position,
        &[r"([^\s|,，;；:：]*(?:工程师|经理|主管|总监|专员|助理|设计师|分析师|顾问|实习生|engineer|manager|developer|intern))"],
    ),
];

const TIME_LABEL: &str = r"起止时间|起止日期|在校时间|任职时间|时间|time\s*range|period";

/// Ordered pattern lists keyed by `K`.
#[derive(Debug)]
pub struct PatternTable<K> {
    rules: Vec<(K, Vec<Regex>)>,
}

impl<K: Copy + PartialEq> PatternTable<K> {
    fn compile(spec: &[(K, &[&str])]) -> Result<Self> {
        Self::from_sources(spec.iter().map(|(key, sources)| {
            (*key, sources.iter().map(|source| source.to_string()).collect())
        }))
    }

    fn from_sources(spec: impl IntoIterator<Item = (K, Vec<String>)>) -> Result<Self> {
        let mut rules = Vec::new();
        for (key, sources) in spec {
            let patterns = sources
                .iter()
                .map(|source| compile(source))
                .collect::<Result<Vec<Regex>>>()?;
            rules.push((key, patterns));
        }
        Ok(Self { rules })
    }

    /// Patterns for `key` in priority order; empty when the key is unknown.
    pub fn patterns(&self, key: K) -> &[Regex] {
        self.rules
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, patterns)| patterns.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &[Regex])> {
        self.rules
            .iter()
            .map(|(key, patterns)| (*key, patterns.as_slice()))
    }
}

/// Header aliases of one section, in priority order.
#[derive(Debug)]
pub struct SectionHeader {
    pub section: Section,
    pub aliases: Vec<Regex>,
}

/// Every rule the extraction stages consult.
#[derive(Debug)]
pub struct RuleSet {
    pub fields: PatternTable<Field>,
    pub sections: Vec<SectionHeader>,
    /// `label: value` patterns per attribute, value in group 1.
    pub attribute_labels: PatternTable<Attribute>,
    /// Bare keyword patterns per attribute, value in group 1.
    pub attribute_keywords: PatternTable<Attribute>,
    /// Start of a responsibilities value: label plus colon.
    pub responsibilities_start: Regex,
    /// A line that opens with any recognized entry label.
    pub entry_label_line: Regex,
    /// `起止时间：<value>`, value in group 1.
    pub time_label: Regex,
    /// A bare `start – end` range anywhere in the text.
    pub time_anchor: Regex,
    /// A line that opens with a time label or a bare range.
    pub time_line: Regex,
    /// `YYYY-MM <dash> (YYYY-MM | token)` at the start of a range string.
    pub precise_range: Regex,
    /// Any dash variant with optional surrounding spaces.
    pub dash_split: Regex,
}

impl RuleSet {
    fn compile() -> Result<Self> {
        let fields = PatternTable::compile(FIELD_RULES)?;

        let mut sections = Vec::with_capacity(SECTION_ALIASES.len());
        for (section, aliases) in SECTION_ALIASES {
            let aliases = aliases
                .iter()
                .map(|alias| compile(&format!("{}{COLON}?", regex::escape(alias))))
                .collect::<Result<Vec<Regex>>>()?;
            sections.push(SectionHeader {
                section: *section,
                aliases,
            });
        }

        let attribute_labels =
            PatternTable::from_sources(ATTRIBUTE_LABELS.iter().map(|(attribute, label)| {
                (
                    *attribute,
                    vec![format!(r"(?:{label})\s*{COLON}[ \t]*([^\n]+)")],
                )
            }))?;
        let attribute_keywords = PatternTable::compile(ATTRIBUTE_KEYWORDS)?;

        let responsibilities_label = ATTRIBUTE_LABELS
            .iter()
            .find(|(attribute, _)| *attribute == Attribute::Responsibilities)
            .map(|(_, label)| *label)
            .context("responsibilities label missing from attribute labels")?;
        let responsibilities_start =
            compile(&format!(r"(?:{responsibilities_label})\s*{COLON}[ \t]*"))?;

        let all_labels = ATTRIBUTE_LABELS
            .iter()
            .map(|(_, label)| *label)
            .chain(std::iter::once(TIME_LABEL))
            .collect::<Vec<&str>>()
            .join("|");
        let entry_label_line = compile(&format!(r"^\s*(?:{all_labels})\s*{COLON}"))?;

        let time_label = compile(&format!(r"(?:{TIME_LABEL})\s*{COLON}[ \t]*([^\n]+)"))?;
        let time_anchor = compile(&format!(
            r"(?P<start>{DATE_TOKEN})[ \t]*(?:(?:[-–—~～]+|到)[ \t]*(?P<end>{DATE_TOKEN}|{PRESENT_TOKEN})|(?P<open>{PRESENT_TOKEN}))"
        ))?;
        let time_line = compile(&format!(
            r"^[ \t]*(?:(?:{TIME_LABEL})[ \t]*{COLON}|{DATE_TOKEN}[ \t]*(?:[-–—~～]+|到|{PRESENT_TOKEN}))"
        ))?;

        let precise_range = compile(r"^(\d{4}-\d{2})\s*[-–—]\s*(\d{4}-\d{2}|\S+)")?;
        let dash_split = compile(r"\s*[-–—]\s*")?;

        Ok(Self {
            fields,
            sections,
            attribute_labels,
            attribute_keywords,
            responsibilities_start,
            entry_label_line,
            time_label,
            time_anchor,
            time_line,
            precise_range,
            dash_split,
        })
    }

    pub fn section_aliases(&self, section: Section) -> &[Regex] {
        self.sections
            .iter()
            .find(|header| header.section == section)
            .map(|header| header.aliases.as_slice())
            .unwrap_or(&[])
    }
}

fn compile(source: &str) -> Result<Regex> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .with_context(|| format!("failed to compile pattern: {source}"))
}

static RULES: OnceCell<RuleSet> = OnceCell::new();

/// The process-wide rule set, compiled on first use.
pub fn rules() -> Result<&'static RuleSet> {
    RULES.get_or_try_init(RuleSet::compile)
}
