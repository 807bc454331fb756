use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::bus::ChangeBus;
use crate::cache::LocalCache;
use crate::config::RemoteConfig;
use crate::model::{
    clamp_score, normalize_year, phase_from_class, Dataset, LearningObjective, ReportCoverConfig,
    ReportExtras, ReportGrade, SchoolData, Session, Student, StudentProfile, User,
};
use crate::remote::{HttpRemote, RemoteStore};
use crate::sync::SyncEngine;

/// Application root of the data core: the local cache, the change bus and
/// the sync engine, plus the typed repository functions the IPC handlers
/// call. Every write lands in the cache first and is then propagated
/// best-effort; no repository performs network I/O directly.
pub struct Store {
    cache: Arc<LocalCache>,
    sync: SyncEngine,
}

const DEFAULT_POLL: Duration = Duration::from_secs(5);

impl Store {
    pub fn open(workspace: &Path, config: Option<RemoteConfig>) -> anyhow::Result<Store> {
        let bus = Arc::new(ChangeBus::new());
        let cache = Arc::new(LocalCache::open(workspace, bus)?);

        let remote: Option<Arc<dyn RemoteStore>> = match &config {
            Some(cfg) => match HttpRemote::new(cfg) {
                Ok(r) => Some(Arc::new(r)),
                Err(e) => {
                    log::warn!("remote client init failed, running offline: {e}");
                    None
                }
            },
            None => None,
        };
        let poll = config
            .as_ref()
            .map(|c| c.poll_interval)
            .unwrap_or(DEFAULT_POLL);
        let sync = SyncEngine::new(cache.clone(), remote, poll);

        Ok(Store { cache, sync })
    }

    #[cfg(test)]
    pub fn open_with_remote(
        workspace: &Path,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> anyhow::Result<Store> {
        let bus = Arc::new(ChangeBus::new());
        let cache = Arc::new(LocalCache::open(workspace, bus)?);
        let sync = SyncEngine::new(cache.clone(), remote, Duration::from_millis(50));
        Ok(Store { cache, sync })
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn bus(&self) -> &Arc<ChangeBus> {
        self.cache.bus()
    }

    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    fn read_all<T: DeserializeOwned>(&self, dataset: Dataset) -> anyhow::Result<Vec<T>> {
        let mut out = Vec::new();
        for raw in self.cache.read(dataset)? {
            match serde_json::from_value::<T>(raw) {
                Ok(record) => out.push(record),
                Err(e) => {
                    log::warn!(
                        "dropping malformed {} record: {e}",
                        dataset.storage_key()
                    );
                }
            }
        }
        Ok(out)
    }

    /// Upsert one record into the cache and queue its remote save.
    fn save_record<T, F>(
        &self,
        dataset: Dataset,
        doc_id: &str,
        record: &T,
        matches: F,
    ) -> anyhow::Result<()>
    where
        T: Serialize,
        F: Fn(&Value) -> bool,
    {
        let doc = serde_json::to_value(record)?;
        self.cache.upsert(dataset, doc.clone(), matches)?;
        self.sync.schedule_save(dataset, doc_id, doc);
        Ok(())
    }

    // --- users ---

    pub fn users(&self) -> anyhow::Result<Vec<User>> {
        self.read_all(Dataset::Users)
    }

    pub fn save_user(&self, mut user: User) -> anyhow::Result<User> {
        if user.id.is_empty() {
            user.id = new_id();
        }
        let id = user.id.clone();
        self.save_record(Dataset::Users, &id, &user, |v| v["id"] == id.as_str())?;
        Ok(user)
    }

    pub fn delete_user(&self, user_id: &str) -> anyhow::Result<usize> {
        let removed = self
            .cache
            .delete_where(Dataset::Users, |v| v["id"] == user_id)?;
        self.sync.schedule_delete(Dataset::Users, user_id);
        Ok(removed)
    }

    pub fn homeroom_teacher(&self, class_name: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users()?
            .into_iter()
            .find(|u| u.homeroom_class.as_deref() == Some(class_name)))
    }

    // --- session ---

    pub fn login(
        &self,
        username: &str,
        password: &str,
        academic_year: &str,
    ) -> anyhow::Result<Option<Session>> {
        let user = self.users()?.into_iter().find(|u| {
            u.username == username && u.password.as_deref() == Some(password)
        });
        let Some(user) = user else {
            return Ok(None);
        };
        let session = Session {
            user,
            academic_year: academic_year.to_string(),
        };
        self.cache
            .write(Dataset::Session, serde_json::to_value(&session)?)?;
        Ok(Some(session))
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        self.cache.write(Dataset::Session, Value::Null)
    }

    pub fn session(&self) -> anyhow::Result<Option<Session>> {
        let doc = self.cache.read_doc(Dataset::Session)?;
        if doc.is_null() {
            return Ok(None);
        }
        Ok(serde_json::from_value(doc).ok())
    }

    // --- students ---

    pub fn students(&self) -> anyhow::Result<Vec<Student>> {
        self.read_all(Dataset::Students)
    }

    pub fn save_student(&self, mut student: Student) -> anyhow::Result<Student> {
        if student.id.is_empty() {
            student.id = new_id();
        }
        student.phase = phase_from_class(&student.class).to_string();
        let id = student.id.clone();
        self.save_record(Dataset::Students, &id, &student, |v| v["id"] == id.as_str())?;
        Ok(student)
    }

    /// Deleting a student leaves its grades, extras and profile behind.
    /// Dangling references are a documented state of the system, not
    /// something this call repairs.
    pub fn delete_student(&self, student_id: &str) -> anyhow::Result<usize> {
        let removed = self
            .cache
            .delete_where(Dataset::Students, |v| v["id"] == student_id)?;
        self.sync.schedule_delete(Dataset::Students, student_id);
        Ok(removed)
    }

    // --- student profiles ---

    pub fn student_profile(&self, student_id: &str) -> anyhow::Result<StudentProfile> {
        let found = self
            .read_all::<StudentProfile>(Dataset::StudentProfiles)?
            .into_iter()
            .find(|p| p.student_id == student_id);
        Ok(found.unwrap_or_else(|| StudentProfile::empty_for(student_id)))
    }

    pub fn save_student_profile(&self, profile: StudentProfile) -> anyhow::Result<()> {
        let sid = profile.student_id.clone();
        self.save_record(Dataset::StudentProfiles, &sid, &profile, |v| {
            v["studentId"] == sid.as_str()
        })
    }

    // --- learning objectives ---

    pub fn tps(
        &self,
        subject: Option<&str>,
        phase: Option<&str>,
        class_target: Option<&str>,
    ) -> anyhow::Result<Vec<LearningObjective>> {
        let mut tps: Vec<LearningObjective> = self.read_all(Dataset::LearningObjectives)?;
        if let Some(subject) = subject.filter(|s| !s.is_empty()) {
            tps.retain(|tp| tp.subject == subject);
        }
        if let Some(phase) = phase.filter(|s| !s.is_empty()) {
            tps.retain(|tp| tp.phase == phase);
        }
        if let Some(class) = class_target.filter(|s| !s.is_empty()) {
            tps.retain(|tp| tp.class_target == class || tp.class_target == "Semua");
        }
        Ok(tps)
    }

    pub fn add_tp(&self, mut tp: LearningObjective) -> anyhow::Result<LearningObjective> {
        if tp.id.is_empty() {
            tp.id = new_id();
        }
        let id = tp.id.clone();
        self.save_record(Dataset::LearningObjectives, &id, &tp, |v| {
            v["id"] == id.as_str()
        })?;
        Ok(tp)
    }

    pub fn delete_tp(&self, tp_id: &str) -> anyhow::Result<usize> {
        let removed = self
            .cache
            .delete_where(Dataset::LearningObjectives, |v| v["id"] == tp_id)?;
        self.sync.schedule_delete(Dataset::LearningObjectives, tp_id);
        Ok(removed)
    }

    // --- report grades ---

    pub fn all_report_grades(&self) -> anyhow::Result<Vec<ReportGrade>> {
        self.read_all(Dataset::ReportGrades)
    }

    /// Grades for one semester, optionally narrowed to a subject and an
    /// academic year. Year filtering is a substring match so a short year
    /// label ("2025/2026") also matches longer stored variants; grades with
    /// no year recorded never match a year filter.
    pub fn report_grades(
        &self,
        subject: Option<&str>,
        semester: &str,
        academic_year: Option<&str>,
    ) -> anyhow::Result<Vec<ReportGrade>> {
        let mut grades = self.all_report_grades()?;
        grades.retain(|g| {
            let subject_ok = match subject.filter(|s| !s.is_empty()) {
                Some(s) => g.subject == s,
                None => true,
            };
            let year_ok = match academic_year.filter(|y| !y.is_empty()) {
                Some(y) => !g.academic_year.is_empty() && g.academic_year.contains(y),
                None => true,
            };
            subject_ok && g.semester == semester && year_ok
        });
        Ok(grades)
    }

    /// Upsert a batch of grades. The score is clamped, the objective sets
    /// are made mutually exclusive (achieved wins over improvement), and a
    /// grade matching an existing (student, subject, semester, year) slot
    /// overwrites in place keeping the existing id.
    pub fn save_report_grades(
        &self,
        batch: Vec<ReportGrade>,
    ) -> anyhow::Result<Vec<ReportGrade>> {
        let mut saved = Vec::with_capacity(batch.len());
        for mut grade in batch {
            grade.final_score = clamp_score(grade.final_score);
            grade
                .improvement_tp_ids
                .retain(|id| !grade.achieved_tp_ids.contains(id));
            if grade.id.is_empty() {
                grade.id = new_id();
            }
            if let Some(existing) = self
                .all_report_grades()?
                .into_iter()
                .find(|g| g.same_slot(&grade))
            {
                grade.id = existing.id;
            }
            let slot = grade.clone();
            let id = grade.id.clone();
            self.save_record(Dataset::ReportGrades, &id, &grade, move |v| {
                match serde_json::from_value::<ReportGrade>(v.clone()) {
                    Ok(g) => g.same_slot(&slot),
                    Err(_) => false,
                }
            })?;
            saved.push(grade);
        }
        Ok(saved)
    }

    // --- report extras ---

    pub fn all_report_extras(&self) -> anyhow::Result<Vec<ReportExtras>> {
        self.read_all(Dataset::ReportExtras)
    }

    /// Extras for one student in one academic-year partition; a fresh
    /// default record when none exists yet. An empty year addresses the
    /// "default" partition, never a dated one.
    pub fn report_extras(
        &self,
        student_id: &str,
        academic_year: &str,
    ) -> anyhow::Result<ReportExtras> {
        let year = normalize_year(academic_year);
        let found = self.all_report_extras()?.into_iter().find(|e| {
            e.student_id == student_id && normalize_year(&e.academic_year) == year
        });
        Ok(found.unwrap_or_else(|| ReportExtras::empty_for(student_id, academic_year)))
    }

    pub fn save_report_extras(&self, mut extras: ReportExtras) -> anyhow::Result<ReportExtras> {
        extras.academic_year = normalize_year(&extras.academic_year);
        let sid = extras.student_id.clone();
        let year = extras.academic_year.clone();
        let doc_id = extras.doc_id();
        self.save_record(Dataset::ReportExtras, &doc_id, &extras, move |v| {
            let same_student = v["studentId"] == sid.as_str();
            let stored_year =
                normalize_year(v["academicYear"].as_str().unwrap_or_default());
            same_student && stored_year == year
        })?;
        Ok(extras)
    }

    // --- settings singletons ---

    pub fn school_data(&self) -> anyhow::Result<SchoolData> {
        let doc = self.cache.read_doc(Dataset::SchoolData)?;
        Ok(serde_json::from_value(doc).unwrap_or_default())
    }

    pub fn save_school_data(&self, data: SchoolData) -> anyhow::Result<()> {
        let doc = serde_json::to_value(&data)?;
        self.cache.write(Dataset::SchoolData, doc.clone())?;
        self.sync.schedule_save(Dataset::SchoolData, "school_data", doc);
        Ok(())
    }

    pub fn cover_config(&self) -> anyhow::Result<ReportCoverConfig> {
        let doc = self.cache.read_doc(Dataset::CoverConfig)?;
        Ok(serde_json::from_value(doc).unwrap_or_default())
    }

    pub fn save_cover_config(&self, config: ReportCoverConfig) -> anyhow::Result<()> {
        let doc = serde_json::to_value(&config)?;
        self.cache.write(Dataset::CoverConfig, doc.clone())?;
        self.sync.schedule_save(Dataset::CoverConfig, "cover_config", doc);
        Ok(())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
