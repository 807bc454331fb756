use serde::Serialize;

use crate::model::{LearningObjective, ReportGrade};

/// Canonical subject order on the printed report.
pub const SUBJECTS: [&str; 37] = [
    "Pendidikan Agama Islam dan Budi Pekerti",
    "Pendidikan Agama Kristen dan Budi Pekerti",
    "Pendidikan Agama Katolik dan Budi Pekerti",
    "Pendidikan Agama Hindu dan Budi Pekerti",
    "Pendidikan Agama Buddha dan Budi Pekerti",
    "Pendidikan Agama Khonghucu dan Budi Pekerti",
    "Pendidikan Pancasila",
    "Bahasa Indonesia",
    "Matematika (Umum)",
    "Matematika (Tingkat Lanjut)",
    "Bahasa Inggris",
    "Bahasa Inggris (Tingkat Lanjut)",
    "Ilmu Pengetahuan Alam (IPA)",
    "Fisika",
    "Kimia",
    "Biologi",
    "Informatika",
    "Ilmu Pengetahuan Sosial (IPS)",
    "Sejarah",
    "Geografi",
    "Ekonomi",
    "Sosiologi",
    "Antropologi",
    "Seni Budaya",
    "Seni Musik",
    "Seni Rupa",
    "Seni Teater",
    "Seni Tari",
    "Pendidikan Jasmani, Olahraga, dan Kesehatan",
    "Prakarya dan Kewirausahaan",
    "Bahasa Arab",
    "Bahasa Jepang",
    "Bahasa Jerman",
    "Bahasa Korea",
    "Bahasa Mandarin",
    "Bahasa Prancis",
    "Muatan Lokal",
];

/// One printable subject row for a student's report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintSubject {
    pub subject: String,
    pub final_score: f64,
    pub description: String,
}

/// Narrative description of one grade, assembled from the objective texts.
/// Objectives are looked up in the global list so an objective created under
/// another class still resolves as long as the id matches.
pub fn generate_description(grade: &ReportGrade, tps: &[LearningObjective]) -> String {
    let achieved: Vec<&str> = tps
        .iter()
        .filter(|tp| grade.achieved_tp_ids.contains(&tp.id))
        .map(|tp| tp.description.as_str())
        .collect();
    let improvement: Vec<&str> = tps
        .iter()
        .filter(|tp| grade.improvement_tp_ids.contains(&tp.id))
        .map(|tp| tp.description.as_str())
        .collect();

    let mut parts = Vec::new();
    if !achieved.is_empty() {
        parts.push(format!(
            "Menunjukkan penguasaan yang baik dalam: {}.",
            achieved.join(", ")
        ));
    }
    if !improvement.is_empty() {
        parts.push(format!("Perlu bimbingan dalam: {}.", improvement.join(", ")));
    }
    if parts.is_empty() {
        "Deskripsi belum tersedia (Input TP diperlukan).".to_string()
    } else {
        parts.join(" ")
    }
}

/// Subject rows that actually print: a subject appears only when its grade
/// has a score above zero and at least one objective marked either way.
/// `grades` is expected to already be narrowed to one student, semester and
/// academic year.
pub fn subjects_to_print(
    grades: &[ReportGrade],
    tps: &[LearningObjective],
) -> Vec<PrintSubject> {
    SUBJECTS
        .iter()
        .filter_map(|subject| {
            let grade = grades.iter().find(|g| g.subject == *subject)?;
            let has_score = grade.final_score > 0.0;
            let has_tps =
                !grade.achieved_tp_ids.is_empty() || !grade.improvement_tp_ids.is_empty();
            if !(has_score && has_tps) {
                return None;
            }
            Some(PrintSubject {
                subject: subject.to_string(),
                final_score: grade.final_score,
                description: generate_description(grade, tps),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tp(id: &str, subject: &str, description: &str) -> LearningObjective {
        LearningObjective {
            id: id.to_string(),
            subject: subject.to_string(),
            description: description.to_string(),
            semester: 1,
            phase: "E".to_string(),
            class_target: "X-A".to_string(),
        }
    }

    fn grade(subject: &str, score: f64) -> ReportGrade {
        ReportGrade {
            id: "g1".to_string(),
            student_id: "s1".to_string(),
            subject: subject.to_string(),
            final_score: score,
            achieved_tp_ids: vec![],
            improvement_tp_ids: vec![],
            semester: "1".to_string(),
            academic_year: "2025/2026".to_string(),
        }
    }

    #[test]
    fn zero_score_subject_is_not_printed() {
        let g = grade("Matematika (Umum)", 0.0);
        let rows = subjects_to_print(&[g], &[]);
        assert!(rows.is_empty());
    }

    #[test]
    fn scored_subject_without_objectives_is_not_printed() {
        let g = grade("Matematika (Umum)", 80.0);
        let rows = subjects_to_print(&[g], &[]);
        assert!(rows.is_empty());
    }

    #[test]
    fn scored_subject_with_achieved_objective_prints_with_description() {
        let objectives = vec![tp(
            "tp1",
            "Matematika (Umum)",
            "Memahami konsep eksponen dan logaritma",
        )];
        let mut g = grade("Matematika (Umum)", 80.0);
        g.achieved_tp_ids = vec!["tp1".to_string()];
        let rows = subjects_to_print(&[g], &objectives);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject, "Matematika (Umum)");
        assert_eq!(rows[0].final_score, 80.0);
        assert!(rows[0]
            .description
            .contains("Memahami konsep eksponen dan logaritma"));
        assert!(rows[0].description.starts_with("Menunjukkan penguasaan"));
    }

    #[test]
    fn description_combines_both_objective_sets() {
        let objectives = vec![
            tp("tp1", "Fisika", "Hukum Newton"),
            tp("tp2", "Fisika", "Termodinamika"),
        ];
        let mut g = grade("Fisika", 75.0);
        g.achieved_tp_ids = vec!["tp1".to_string()];
        g.improvement_tp_ids = vec!["tp2".to_string()];
        let text = generate_description(&g, &objectives);
        assert!(text.contains("Menunjukkan penguasaan yang baik dalam: Hukum Newton."));
        assert!(text.contains("Perlu bimbingan dalam: Termodinamika."));
    }

    #[test]
    fn unresolvable_objectives_fall_back_to_placeholder() {
        let mut g = grade("Kimia", 90.0);
        g.achieved_tp_ids = vec!["missing".to_string()];
        let text = generate_description(&g, &[]);
        assert_eq!(text, "Deskripsi belum tersedia (Input TP diperlukan).");
    }

    #[test]
    fn rows_follow_canonical_subject_order() {
        let objectives = vec![tp("tp1", "x", "d")];
        let mut fisika = grade("Fisika", 80.0);
        fisika.achieved_tp_ids = vec!["tp1".to_string()];
        let mut pancasila = grade("Pendidikan Pancasila", 85.0);
        pancasila.achieved_tp_ids = vec!["tp1".to_string()];
        let rows = subjects_to_print(&[fisika, pancasila], &objectives);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject, "Pendidikan Pancasila");
        assert_eq!(rows[1].subject, "Fisika");
    }
}
