use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chrono::NaiveDate;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub roll_number: String,
    /// Derived from session history, always within 0..=100
    pub attendance_percentage: u8,
}

impl Student {
    pub fn new(id: &str, name: &str, roll_number: &str) -> Self {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            roll_number: roll_number.to_string(),
            attendance_percentage: 100,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub present: bool,
}

/// Who recorded a session. A reference only, not an owner.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TakenBy {
    pub id: String,
    pub name: String,
}

impl Default for TakenBy {
    fn default() -> Self {
        TakenBy {
            id: "1".to_string(),
            name: "Dr. Rahul Sharma".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub id: String,
    pub date: NaiveDate,
    pub taken_by: TakenBy,
    pub attendance_records: Vec<AttendanceRecord>,
}

impl AttendanceSession {
    pub fn record(&self, student_id: &str) -> Option<&AttendanceRecord> {
        self.attendance_records
            .iter()
            .find(|r| r.student_id == student_id)
    }

    /// Unmarked students count as present.
    pub fn is_present(&self, student_id: &str) -> bool {
        self.record(student_id).map_or(true, |r| r.present)
    }

    /// Updates the existing record for `student_id` or appends a new one.
    pub fn upsert(&mut self, student_id: &str, present: bool) {
        match self
            .attendance_records
            .iter_mut()
            .find(|r| r.student_id == student_id)
        {
            Some(record) => record.present = present,
            None => self.attendance_records.push(AttendanceRecord {
                student_id: student_id.to_string(),
                present,
            }),
        }
    }
}

/// Teaching assistant listed on a class's people tab
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct TeachingAssistant {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Attendance sheet saved without being submitted
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Draft {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub course: String,
    pub section: String,
    pub year: String,
    pub students: Vec<Student>,
    /// Newest first
    pub sessions: Vec<AttendanceSession>,
}

impl Class {
    /// Creates an empty class with a freshly generated id.
    pub fn new(name: &str, course: &str, section: &str, year: &str) -> Self {
        Class {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            course: course.to_string(),
            section: section.to_string(),
            year: year.to_string(),
            students: Vec::new(),
            sessions: Vec::new(),
        }
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    pub fn session(&self, session_id: &str) -> Option<&AttendanceSession> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    pub fn latest_session(&self) -> Option<&AttendanceSession> {
        self.sessions.first()
    }

    /// Case-insensitive match on name or roll number. An empty term matches everyone.
    pub fn search_students(&self, term: &str) -> Vec<&Student> {
        let needle = term.to_lowercase();
        self.students
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s.roll_number.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Counts (present, total) over every session holding a record for the student.
    pub fn tally(&self, student_id: &str) -> (u32, u32) {
        self.sessions
            .iter()
            .flat_map(|session| session.attendance_records.iter())
            .filter(|record| record.student_id == student_id)
            .fold((0, 0), |(present, total), record| {
                (present + record.present as u32, total + 1)
            })
    }
}

/// `round(100 * part / whole)` with halves rounded up, in integer arithmetic.
pub fn percentage(part: u32, whole: u32) -> Option<u8> {
    if whole == 0 {
        return None;
    }
    let value = (200 * part as u64 + whole as u64) / (2 * whole as u64);
    Some(value.min(100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(records: &[(&str, bool)]) -> AttendanceSession {
        AttendanceSession {
            id: "sess-1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            taken_by: TakenBy::default(),
            attendance_records: records
                .iter()
                .map(|(id, present)| AttendanceRecord {
                    student_id: id.to_string(),
                    present: *present,
                })
                .collect(),
        }
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(percentage(2, 3), Some(67));
        assert_eq!(percentage(1, 3), Some(33));
        assert_eq!(percentage(1, 8), Some(13));
        assert_eq!(percentage(1, 40), Some(3));
        assert_eq!(percentage(0, 5), Some(0));
        assert_eq!(percentage(5, 5), Some(100));
        assert_eq!(percentage(0, 0), None);
    }

    #[test]
    fn test_upsert_keeps_one_record_per_student() {
        let mut session = session_with(&[("a", true)]);
        session.upsert("a", false);
        session.upsert("b", false);
        session.upsert("b", true);
        assert_eq!(session.attendance_records.len(), 2);
        assert!(!session.is_present("a"));
        assert!(session.is_present("b"));
    }

    #[test]
    fn test_unmarked_student_is_present() {
        let session = session_with(&[]);
        assert!(session.is_present("ghost"));
        assert!(session.record("ghost").is_none());
    }

    #[test]
    fn test_search_students_matches_name_and_roll() {
        let mut class = Class::new("Compilers", "CS501", "A", "Fifth Year");
        class.students.push(Student::new("1", "Riya 2024", "IIB2024001"));
        class.students.push(Student::new("2", "Aman 2024", "IIB2024002"));

        assert_eq!(class.search_students("riya").len(), 1);
        assert_eq!(class.search_students("iib2024002")[0].id, "2");
        assert_eq!(class.search_students("").len(), 2);
        assert!(class.search_students("zzz").is_empty());
    }

    #[test]
    fn test_class_json_uses_camel_case() {
        let mut class = Class::new("Compilers", "CS501", "A", "Fifth Year");
        class.students.push(Student::new("1", "Riya", "IIB1"));
        class.sessions.push(session_with(&[("1", false)]));

        let json = serde_json::to_string(&class).unwrap();
        assert!(json.contains("\"rollNumber\":\"IIB1\""));
        assert!(json.contains("\"attendancePercentage\":100"));
        assert!(json.contains("\"takenBy\""));
        assert!(json.contains("\"studentId\":\"1\""));
        assert!(json.contains("\"date\":\"2025-01-06\""));

        let back: Class = serde_json::from_str(&json).unwrap();
        assert_eq!(back, class);
    }
}
