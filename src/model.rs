use std::path::Path;

use serde::{Deserialize, Serialize};

/// Declared origin of a document. The kind is trusted as declared; the
/// bytes are never sniffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Word,
    Pdf,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Pdf => "pdf",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim_start_matches('.');
        if extension.eq_ignore_ascii_case("docx") {
            Some(Self::Word)
        } else if extension.eq_ignore_ascii_case("pdf") {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Scalar fields of a [`Record`], in serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Gender,
    Age,
    PoliticalAffiliation,
    Weight,
    Hometown,
    HealthStatus,
    Height,
    EducationLevel,
    GraduatingInstitution,
    Major,
    JobTarget,
    Phone,
    Email,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::Name,
        Field::Gender,
        Field::Age,
        Field::PoliticalAffiliation,
        Field::Weight,
        Field::Hometown,
        Field::HealthStatus,
        Field::Height,
        Field::EducationLevel,
        Field::GraduatingInstitution,
        Field::Major,
        Field::JobTarget,
        Field::Phone,
        Field::Email,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Gender => "gender",
            Field::Age => "age",
            Field::PoliticalAffiliation => "political_affiliation",
            Field::Weight => "weight",
            Field::Hometown => "hometown",
            Field::HealthStatus => "health_status",
            Field::Height => "height",
            Field::EducationLevel => "education_level",
            Field::GraduatingInstitution => "graduating_institution",
            Field::Major => "major",
            Field::JobTarget => "job_target",
            Field::Phone => "phone",
            Field::Email => "email",
        }
    }
}

/// Named document sections located by header aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Education,
    Honors,
    Certifications,
    Employment,
    Hobbies,
    SelfAssessment,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Education,
        Section::Honors,
        Section::Certifications,
        Section::Employment,
        Section::Hobbies,
        Section::SelfAssessment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Education => "education_history",
            Section::Honors => "honors",
            Section::Certifications => "certifications",
            Section::Employment => "employment_history",
            Section::Hobbies => "hobbies",
            Section::SelfAssessment => "self_assessment",
        }
    }

    /// The entry role reconstructed from this section, if any.
    pub fn entry_role(self) -> Option<EntryRole> {
        match self {
            Section::Education => Some(EntryRole::Education),
            Section::Employment => Some(EntryRole::Employment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryRole {
    Education,
    Employment,
}

impl EntryRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryRole::Education => "education",
            EntryRole::Employment => "employment",
        }
    }

    pub fn section(self) -> Section {
        match self {
            EntryRole::Education => Section::Education,
            EntryRole::Employment => Section::Employment,
        }
    }

    pub fn attributes(self) -> &'static [Attribute] {
        match self {
            EntryRole::Education => &[Attribute::School, Attribute::Degree, Attribute::Major],
            EntryRole::Employment => &[
                Attribute::Company,
                Attribute::Position,
                Attribute::Responsibilities,
            ],
        }
    }
}

/// Role-specific attributes of an [`Entry`] besides its time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    School,
    Degree,
    Major,
    Company,
    Position,
    Responsibilities,
}

impl Attribute {
    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::School => "school",
            Attribute::Degree => "degree",
            Attribute::Major => "major",
            Attribute::Company => "company",
            Attribute::Position => "position",
            Attribute::Responsibilities => "responsibilities",
        }
    }

    /// Label written in front of the value when an entry is rendered
    /// back to text.
    pub fn label(self) -> &'static str {
        match self {
            Attribute::School => "学校",
            Attribute::Degree => "学历",
            Attribute::Major => "专业",
            Attribute::Company => "公司",
            Attribute::Position => "职位",
            Attribute::Responsibilities => "主要职责",
        }
    }
}

/// One education or employment stretch.
///
/// Unset attributes are omitted from the JSON object; this JSON shape is
/// the interchange format read back by export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsibilities: Option<String>,
}

impl Entry {
    pub fn get(&self, attribute: Attribute) -> Option<&str> {
        let value = match attribute {
            Attribute::School => &self.school,
            Attribute::Degree => &self.degree,
            Attribute::Major => &self.major,
            Attribute::Company => &self.company,
            Attribute::Position => &self.position,
            Attribute::Responsibilities => &self.responsibilities,
        };
        value.as_deref()
    }

    pub fn set(&mut self, attribute: Attribute, value: String) {
        let slot = match attribute {
            Attribute::School => &mut self.school,
            Attribute::Degree => &mut self.degree,
            Attribute::Major => &mut self.major,
            Attribute::Company => &mut self.company,
            Attribute::Position => &mut self.position,
            Attribute::Responsibilities => &mut self.responsibilities,
        };
        *slot = Some(value);
    }

    pub fn has_time(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some() || self.time_range.is_some()
    }

    pub fn has_attributes(&self) -> bool {
        [
            &self.school,
            &self.degree,
            &self.major,
            &self.company,
            &self.position,
            &self.responsibilities,
        ]
        .iter()
        .any(|value| value.is_some())
    }

    pub fn is_empty(&self) -> bool {
        !self.has_time() && !self.has_attributes()
    }
}

/// Fixed-schema output of one document parse. Every key is always present
/// when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub age: Option<String>,
    pub political_affiliation: Option<String>,
    pub weight: Option<String>,
    pub hometown: Option<String>,
    pub health_status: Option<String>,
    pub height: Option<String>,
    pub education_level: Option<String>,
    pub graduating_institution: Option<String>,
    pub major: Option<String>,
    pub job_target: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub education_history: Vec<Entry>,
    pub honors: Option<String>,
    pub certifications: Option<String>,
    pub employment_history: Vec<Entry>,
    pub hobbies: Option<String>,
    pub self_assessment: Option<String>,
}

impl Record {
    pub fn field(&self, field: Field) -> Option<&str> {
        self.field_slot(field).as_deref()
    }

    pub fn set_field(&mut self, field: Field, value: Option<String>) {
        *self.field_slot_mut(field) = value;
    }

    fn field_slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Name => &self.name,
            Field::Gender => &self.gender,
            Field::Age => &self.age,
            Field::PoliticalAffiliation => &self.political_affiliation,
            Field::Weight => &self.weight,
            Field::Hometown => &self.hometown,
            Field::HealthStatus => &self.health_status,
            Field::Height => &self.height,
            Field::EducationLevel => &self.education_level,
            Field::GraduatingInstitution => &self.graduating_institution,
            Field::Major => &self.major,
            Field::JobTarget => &self.job_target,
            Field::Phone => &self.phone,
            Field::Email => &self.email,
        }
    }

    fn field_slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Gender => &mut self.gender,
            Field::Age => &mut self.age,
            Field::PoliticalAffiliation => &mut self.political_affiliation,
            Field::Weight => &mut self.weight,
            Field::Hometown => &mut self.hometown,
            Field::HealthStatus => &mut self.health_status,
            Field::Height => &mut self.height,
            Field::EducationLevel => &mut self.education_level,
            Field::GraduatingInstitution => &mut self.graduating_institution,
            Field::Major => &mut self.major,
            Field::JobTarget => &mut self.job_target,
            Field::Phone => &mut self.phone,
            Field::Email => &mut self.email,
        }
    }

    /// Free-text span of a section that is not reconstructed into entries.
    pub fn section_text(&self, section: Section) -> Option<&str> {
        match section {
            Section::Honors => self.honors.as_deref(),
            Section::Certifications => self.certifications.as_deref(),
            Section::Hobbies => self.hobbies.as_deref(),
            Section::SelfAssessment => self.self_assessment.as_deref(),
            Section::Education | Section::Employment => None,
        }
    }

    pub fn set_section_text(&mut self, section: Section, value: Option<String>) {
        match section {
            Section::Honors => self.honors = value,
            Section::Certifications => self.certifications = value,
            Section::Hobbies => self.hobbies = value,
            Section::SelfAssessment => self.self_assessment = value,
            Section::Education | Section::Employment => {}
        }
    }

    pub fn entries(&self, role: EntryRole) -> &[Entry] {
        match role {
            EntryRole::Education => &self.education_history,
            EntryRole::Employment => &self.employment_history,
        }
    }

    pub fn set_entries(&mut self, role: EntryRole, entries: Vec<Entry>) {
        match role {
            EntryRole::Education => self.education_history = entries,
            EntryRole::Employment => self.employment_history = entries,
        }
    }

    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|field| self.field(*field).is_none())
            && Section::ALL
                .iter()
                .all(|section| self.section_text(*section).is_none())
            && self.education_history.is_empty()
            && self.employment_history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_serializes_every_key() {
        let value = serde_json::to_value(Record::default()).expect("record should serialize");
        let object = value.as_object().expect("record serializes to an object");

        for field in Field::ALL {
            assert!(object[field.as_str()].is_null(), "{} should be null", field.as_str());
        }
        for section in Section::ALL {
            assert!(object.contains_key(section.as_str()));
        }
        assert_eq!(object["education_history"], serde_json::json!([]));
        assert_eq!(object["employment_history"], serde_json::json!([]));
        assert_eq!(object.len(), 20);
    }

    #[test]
    fn entry_omits_unset_attributes() {
        let mut entry = Entry {
            start_time: Some("2020-07".to_string()),
            end_time: Some("至今".to_string()),
            ..Entry::default()
        };
        entry.set(Attribute::Company, "星河科技有限公司".to_string());

        let raw = serde_json::to_string(&entry).expect("entry should serialize");
        assert_eq!(
            raw,
            r#"{"start_time":"2020-07","end_time":"至今","company":"星河科技有限公司"}"#
        );
    }

    #[test]
    fn source_kind_resolves_declared_extensions() {
        assert_eq!(SourceKind::from_extension("DOCX"), Some(SourceKind::Word));
        assert_eq!(SourceKind::from_extension(".pdf"), Some(SourceKind::Pdf));
        assert_eq!(SourceKind::from_extension("doc"), None);
        assert_eq!(
            SourceKind::from_path(Path::new("/tmp/resume.Pdf")),
            Some(SourceKind::Pdf)
        );
    }

    #[test]
    fn record_is_empty_tracks_sections_and_entries() {
        let mut record = Record::default();
        assert!(record.is_empty());

        record.set_section_text(Section::Hobbies, Some("篮球".to_string()));
        assert!(!record.is_empty());

        record.set_section_text(Section::Hobbies, None);
        record.set_entries(EntryRole::Employment, vec![Entry::default()]);
        assert!(!record.is_empty());
    }
}
