use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One logical collection of records, cached locally and (except for the
/// session) mirrored to a remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Users,
    Students,
    StudentProfiles,
    LearningObjectives,
    ReportGrades,
    ReportExtras,
    Session,
    SchoolData,
    CoverConfig,
}

pub const ALL_DATASETS: [Dataset; 9] = [
    Dataset::Users,
    Dataset::Students,
    Dataset::StudentProfiles,
    Dataset::LearningObjectives,
    Dataset::ReportGrades,
    Dataset::ReportExtras,
    Dataset::Session,
    Dataset::SchoolData,
    Dataset::CoverConfig,
];

/// Remote location of a dataset: a whole collection, or one document inside
/// the shared `settings` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteTarget {
    Collection(&'static str),
    SettingsDoc(&'static str),
    None,
}

impl Dataset {
    /// Key of the row holding this dataset in the local cache.
    pub fn storage_key(self) -> &'static str {
        match self {
            Dataset::Users => "users",
            Dataset::Students => "students",
            Dataset::StudentProfiles => "student-profiles",
            Dataset::LearningObjectives => "learning-objectives",
            Dataset::ReportGrades => "report-grades",
            Dataset::ReportExtras => "report-extras",
            Dataset::Session => "session",
            Dataset::SchoolData => "school-data",
            Dataset::CoverConfig => "cover-config",
        }
    }

    pub fn remote_target(self) -> RemoteTarget {
        match self {
            Dataset::Users => RemoteTarget::Collection("users"),
            Dataset::Students => RemoteTarget::Collection("students"),
            Dataset::StudentProfiles => RemoteTarget::Collection("student_profiles"),
            Dataset::LearningObjectives => RemoteTarget::Collection("tps"),
            Dataset::ReportGrades => RemoteTarget::Collection("report_grades"),
            Dataset::ReportExtras => RemoteTarget::Collection("report_extras"),
            Dataset::Session => RemoteTarget::None,
            Dataset::SchoolData => RemoteTarget::SettingsDoc("school_data"),
            Dataset::CoverConfig => RemoteTarget::SettingsDoc("cover_config"),
        }
    }

    /// Singleton datasets hold one document instead of an array of records.
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            Dataset::Session | Dataset::SchoolData | Dataset::CoverConfig
        )
    }

    /// Payload persisted the first time a dataset is read before ever being
    /// written. Collections seed as arrays, singletons as a single document
    /// (the session seeds as null: nobody logged in).
    pub fn seed(self) -> Value {
        match self {
            Dataset::Users => json!([{
                "id": "1",
                "username": "admin",
                "password": "123",
                "name": "Administrator",
                "role": "admin",
            }]),
            Dataset::LearningObjectives => json!([{
                "id": "tp1",
                "subject": "Matematika (Umum)",
                "description": "Memahami konsep eksponen dan logaritma",
                "semester": 1,
                "phase": "E",
                "classTarget": "X-A",
            }]),
            Dataset::SchoolData => {
                serde_json::to_value(SchoolData::default()).unwrap_or_else(|_| json!({}))
            }
            Dataset::CoverConfig => {
                serde_json::to_value(ReportCoverConfig::default()).unwrap_or_else(|_| json!({}))
            }
            Dataset::Session => Value::Null,
            _ => json!([]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Guru,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Guru
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homeroom_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub nisn: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class: String,
    #[serde(default = "default_phase")]
    pub phase: String,
}

fn default_phase() -> String {
    "E".to_string()
}

/// Phase E covers class X, phase F covers XI and XII.
pub fn phase_from_class(class_name: &str) -> &'static str {
    if class_name.starts_with("XI") {
        "F"
    } else if class_name.starts_with('X') {
        "E"
    } else {
        "F"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub nis: String,
    #[serde(default)]
    pub nisn: String,
    #[serde(default)]
    pub birth_place: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default = "default_gender")]
    pub gender: String,
    #[serde(default = "default_religion")]
    pub religion: String,
    #[serde(default = "default_family_status")]
    pub family_status: String,
    #[serde(default)]
    pub child_order: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub origin_school: String,
    #[serde(default = "default_accepted_class")]
    pub accepted_class: String,
    #[serde(default)]
    pub accepted_date: String,
    #[serde(default)]
    pub father_name: String,
    #[serde(default)]
    pub mother_name: String,
    #[serde(default)]
    pub guardian_job: String,
    #[serde(default)]
    pub photo_url: String,
}

fn default_gender() -> String {
    "Laki-laki".to_string()
}
fn default_religion() -> String {
    "Islam".to_string()
}
fn default_family_status() -> String {
    "Anak Kandung".to_string()
}
fn default_accepted_class() -> String {
    "X".to_string()
}

impl StudentProfile {
    pub fn empty_for(student_id: &str) -> StudentProfile {
        StudentProfile {
            student_id: student_id.to_string(),
            nis: String::new(),
            nisn: String::new(),
            birth_place: String::new(),
            birth_date: String::new(),
            gender: default_gender(),
            religion: default_religion(),
            family_status: default_family_status(),
            child_order: String::new(),
            address: String::new(),
            phone: String::new(),
            origin_school: String::new(),
            accepted_class: default_accepted_class(),
            accepted_date: String::new(),
            father_name: String::new(),
            mother_name: String::new(),
            guardian_job: String::new(),
            photo_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningObjective {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_semester")]
    pub semester: i64,
    #[serde(default = "default_phase")]
    pub phase: String,
    #[serde(default)]
    pub class_target: String,
}

fn default_semester() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGrade {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub final_score: f64,
    #[serde(default)]
    pub achieved_tp_ids: Vec<String>,
    #[serde(default)]
    pub improvement_tp_ids: Vec<String>,
    #[serde(default)]
    pub semester: String,
    #[serde(default)]
    pub academic_year: String,
}

impl ReportGrade {
    /// Two grades address the same report cell when student, subject,
    /// semester and academic year all match.
    pub fn same_slot(&self, other: &ReportGrade) -> bool {
        self.student_id == other.student_id
            && self.subject == other.subject
            && self.semester == other.semester
            && self.academic_year == other.academic_year
    }

    /// Toggle an objective in the achieved set. Adding it removes the same
    /// id from the improvement set; the two sets never share an id.
    pub fn toggle_achieved(&mut self, tp_id: &str) {
        if let Some(pos) = self.achieved_tp_ids.iter().position(|id| id == tp_id) {
            self.achieved_tp_ids.remove(pos);
        } else {
            self.achieved_tp_ids.push(tp_id.to_string());
            self.improvement_tp_ids.retain(|id| id != tp_id);
        }
    }

    /// Toggle an objective in the needs-improvement set, mirror of
    /// `toggle_achieved`.
    pub fn toggle_improvement(&mut self, tp_id: &str) {
        if let Some(pos) = self.improvement_tp_ids.iter().position(|id| id == tp_id) {
            self.improvement_tp_ids.remove(pos);
        } else {
            self.improvement_tp_ids.push(tp_id.to_string());
            self.achieved_tp_ids.retain(|id| id != tp_id);
        }
    }
}

/// Clamp a raw score into the report range.
pub fn clamp_score(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    raw.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(default)]
    pub sakit: i64,
    #[serde(default)]
    pub izin: i64,
    #[serde(default)]
    pub alpa: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extracurricular {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub target_class: String,
}

impl Promotion {
    /// Human-readable promotion line for the report footer, or None when no
    /// decision has been recorded.
    pub fn display_text(&self) -> Option<String> {
        let text = match self.status.as_str() {
            "NAIK" => format!("Naik ke Kelas {}", self.target_class),
            "TINGGAL" => format!("Tinggal di Kelas {}", self.target_class),
            "NAIK_PERCOBAAN" => format!("Naik Percobaan ke Kelas {}", self.target_class),
            "TINGGAL_PERCOBAAN" => format!("Tinggal Percobaan di Kelas {}", self.target_class),
            _ => return None,
        };
        Some(text)
    }
}

/// Sentinel partition for extras saved without an academic year. Dated and
/// undated records never merge.
pub const DEFAULT_YEAR: &str = "default";

pub fn normalize_year(year: &str) -> String {
    let t = year.trim();
    if t.is_empty() {
        DEFAULT_YEAR.to_string()
    } else {
        t.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExtras {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub academic_year: String,
    #[serde(default)]
    pub attendance: Attendance,
    #[serde(default)]
    pub extracurriculars: Vec<Extracurricular>,
    #[serde(default)]
    pub teacher_note: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub issue_place: String,
    #[serde(default)]
    pub promotion: Promotion,
}

impl ReportExtras {
    pub fn empty_for(student_id: &str, academic_year: &str) -> ReportExtras {
        ReportExtras {
            student_id: student_id.to_string(),
            academic_year: normalize_year(academic_year),
            attendance: Attendance::default(),
            extracurriculars: Vec::new(),
            teacher_note: String::new(),
            date: chrono::Local::now().format("%-d %B %Y").to_string(),
            issue_place: String::new(),
            promotion: Promotion::default(),
        }
    }

    /// Remote document id: student id plus the year partition, with slashes
    /// and spaces flattened so the id stays path-safe.
    pub fn doc_id(&self) -> String {
        let year = normalize_year(&self.academic_year).replace(['/', ' '], "-");
        format!("{}_{}", self.student_id, year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub npsn: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub village: String,
    #[serde(default)]
    pub sub_district: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub principal_name: String,
    #[serde(default)]
    pub principal_nip: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub province_logo_url: String,
}

impl Default for SchoolData {
    fn default() -> Self {
        SchoolData {
            name: "SMA NEGERI 1 PULAU BANYAK BARAT".to_string(),
            npsn: "10101010".to_string(),
            address: "Jl. Pendidikan No. 1".to_string(),
            street: "Jl. Pendidikan No. 1".to_string(),
            village: "Pulau Balai".to_string(),
            sub_district: "Pulau Banyak Barat".to_string(),
            district: "Aceh Singkil".to_string(),
            province: "Aceh".to_string(),
            postal_code: "24791".to_string(),
            principal_name: "Syafriadi, S.Pd,Gr".to_string(),
            principal_nip: "198501012010011001".to_string(),
            website: "sman1pbb.sch.id".to_string(),
            email: "info@sman1pbb.sch.id".to_string(),
            logo_url: String::new(),
            province_logo_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCoverConfig {
    #[serde(default)]
    pub ministry_name_line1: String,
    #[serde(default)]
    pub ministry_name_line2: String,
    #[serde(default)]
    pub report_title: String,
    #[serde(default)]
    pub sub_title: String,
    #[serde(default)]
    pub footer_text: String,
}

impl Default for ReportCoverConfig {
    fn default() -> Self {
        ReportCoverConfig {
            ministry_name_line1: "KEMENTERIAN PENDIDIKAN, KEBUDAYAAN,".to_string(),
            ministry_name_line2: "RISET, DAN TEKNOLOGI".to_string(),
            report_title: "LAPORAN HASIL BELAJAR".to_string(),
            sub_title: "(RAPOR)".to_string(),
            footer_text: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    #[serde(default)]
    pub academic_year: String,
}
