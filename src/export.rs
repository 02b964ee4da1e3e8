use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::ExportError;
use crate::model::{AttendanceSession, Class, percentage};

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

const SHEET_NAME: &str = "Attendance";
const SUMMARY_HEADERS: [&str; 5] = [
    "Name",
    "RollNumber",
    "Classes Attended",
    "Total Classes",
    "Attendance %",
];
const SESSION_HEADERS: [&str; 4] = ["Name", "RollNumber", "Present", "AttendancePercentage"];

/// One line of the class attendance summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub name: String,
    pub roll_number: String,
    pub attended: usize,
    pub total: usize,
    /// `"67%"`, or `"N/A"` when the class has no sessions
    pub percentage: String,
}

/// One line of a single-session sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub name: String,
    pub roll_number: String,
    pub present: bool,
    pub attendance_percentage: u8,
}

/// Build the summary rows for a class
///
/// Attendance is counted against every session of the class, so a student
/// with no record in a session counts as absent for it.
///
/// # Arguments
/// * `class` - The class to summarise
///
/// # Returns
/// * `Result<Vec<SummaryRow>, ExportError>` - One row per student, in roster order
///
/// # Errors
/// * `ExportError::NoStudents` if the class has nobody enrolled
///
/// # Examples
/// ```
/// use attendance::AttendanceStore;
/// use attendance::export::summary_rows;
///
/// let store = AttendanceStore::new();
/// let rows = summary_rows(store.get_class_by_id("cs101").unwrap()).unwrap();
/// assert_eq!(rows.len(), 46);
/// assert_eq!(rows[0].percentage, "N/A");
/// ```
pub fn summary_rows(class: &Class) -> Result<Vec<SummaryRow>, ExportError> {
    if class.students.is_empty() {
        return Err(ExportError::NoStudents(class.name.clone()));
    }

    let total = class.sessions.len();
    let rows = class
        .students
        .iter()
        .map(|student| {
            let attended = class
                .sessions
                .iter()
                .filter(|session| session.record(&student.id).is_some_and(|r| r.present))
                .count();

            let percentage = match percentage(attended as u32, total as u32) {
                Some(value) => format!("{}%", value),
                None => "N/A".to_string(),
            };

            SummaryRow {
                name: student.name.clone(),
                roll_number: student.roll_number.clone(),
                attended,
                total,
                percentage,
            }
        })
        .collect();

    Ok(rows)
}

/// Build the rows of a single-session sheet
///
/// # Arguments
/// * `class` - The class owning the session
/// * `session` - The session to export
///
/// # Returns
/// * `Vec<SessionRow>` - One row per student; unmarked students count as present
pub fn session_rows(class: &Class, session: &AttendanceSession) -> Vec<SessionRow> {
    class
        .students
        .iter()
        .map(|student| SessionRow {
            name: student.name.clone(),
            roll_number: student.roll_number.clone(),
            present: session.is_present(&student.id),
            attendance_percentage: student.attendance_percentage,
        })
        .collect()
}

/// File name for a class summary export
///
/// Whitespace runs in the class name become single underscores.
///
/// # Examples
/// ```
/// use attendance::Class;
/// use attendance::export::summary_file_name;
///
/// let class = Class::new("Data  Structures", "CS201", "B", "Second Year");
/// assert_eq!(
///     summary_file_name(&class).unwrap(),
///     "Data_Structures_AttendanceSummary.xlsx"
/// );
/// ```
pub fn summary_file_name(class: &Class) -> Result<String, ExportError> {
    let name = class.name.trim();
    if name.is_empty() {
        return Err(ExportError::InvalidInput(format!(
            "class {} has no name",
            class.id
        )));
    }
    Ok(format!(
        "{}_AttendanceSummary.xlsx",
        WHITESPACE_RUN.replace_all(name, "_")
    ))
}

/// File name for a single-session export, e.g. `Data Structures_Attendance_2025-01-06.xlsx`
pub fn session_file_name(class: &Class, session: &AttendanceSession) -> String {
    format!(
        "{}_Attendance_{}.xlsx",
        class.name,
        session.date.format("%Y-%m-%d")
    )
}

/// Convert a class summary to XLSX format
///
/// Writes a single `Attendance` worksheet with a bold header row followed
/// by one row per student.
///
/// # Arguments
/// * `class` - The class to export
///
/// # Returns
/// * `Result<Vec<u8>, ExportError>` - XLSX file content as bytes or an error
///
/// # Examples
/// ```
/// use attendance::AttendanceStore;
/// use attendance::export::summary_to_xlsx;
///
/// let store = AttendanceStore::new();
/// let bytes = summary_to_xlsx(store.get_class_by_id("cs201").unwrap()).unwrap();
/// assert!(bytes.starts_with(b"PK"));
/// ```
pub fn summary_to_xlsx(class: &Class) -> Result<Vec<u8>, ExportError> {
    let rows = summary_rows(class)?;

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in SUMMARY_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, row.name.as_str())?;
        worksheet.write_string(r, 1, row.roll_number.as_str())?;
        worksheet.write_number(r, 2, row.attended as f64)?;
        worksheet.write_number(r, 3, row.total as f64)?;
        worksheet.write_string(r, 4, row.percentage.as_str())?;
    }

    let buffer = workbook.save_to_buffer()?;
    info!(
        "Exported attendance summary for {} ({} students)",
        class.id,
        rows.len()
    );
    Ok(buffer)
}

/// Convert a single session to XLSX format
///
/// # Arguments
/// * `class` - The class owning the session
/// * `session_id` - Id of the session to export
///
/// # Returns
/// * `Result<Vec<u8>, ExportError>` - XLSX file content as bytes or an error
///
/// # Errors
/// * `ExportError::InvalidInput` if the session is not part of the class
/// * `ExportError::NoStudents` if the class has nobody enrolled
pub fn session_to_xlsx(class: &Class, session_id: &str) -> Result<Vec<u8>, ExportError> {
    let session = class.session(session_id).ok_or_else(|| {
        ExportError::InvalidInput(format!(
            "session {} does not belong to class {}",
            session_id, class.id
        ))
    })?;
    if class.students.is_empty() {
        return Err(ExportError::NoStudents(class.name.clone()));
    }

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in SESSION_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }

    for (i, row) in session_rows(class, session).iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, row.name.as_str())?;
        worksheet.write_string(r, 1, row.roll_number.as_str())?;
        worksheet.write_string(r, 2, if row.present { "Yes" } else { "No" })?;
        worksheet.write_number(r, 3, row.attendance_percentage as f64)?;
    }

    let buffer = workbook.save_to_buffer()?;
    info!("Exported session {} of {}", session_id, class.id);
    Ok(buffer)
}

/// Convert a class summary to CSV format
///
/// Same columns as the XLSX summary. Fields containing commas, quotes or
/// newlines are quoted, with embedded quotes doubled.
///
/// # Arguments
/// * `class` - The class to export
///
/// # Returns
/// * `Result<String, ExportError>` - CSV content as a string or an error
pub fn summary_to_csv(class: &Class) -> Result<String, ExportError> {
    let rows = summary_rows(class)?;
    let mut csv_content = SUMMARY_HEADERS.join(",");
    csv_content.push('\n');

    for row in &rows {
        let fields = [
            csv_field(&row.name),
            csv_field(&row.roll_number),
            row.attended.to_string(),
            row.total.to_string(),
            csv_field(&row.percentage),
        ];
        csv_content.push_str(&fields.join(","));
        csv_content.push('\n');
    }

    Ok(csv_content)
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Read a class from JSON
///
/// Accepts the camelCase layout produced by serialising a [`Class`].
///
/// # Arguments
/// * `reader` - Source of the JSON document
///
/// # Returns
/// * `Result<Class, ExportError>` - The decoded class
///
/// # Errors
/// * `ExportError::InvalidInput` if the document is not valid class data,
///   for example when the `students` or `sessions` arrays are missing
/// * `ExportError::Io` if reading fails
pub fn read_class(mut reader: impl Read) -> Result<Class, ExportError> {
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(|e| ExportError::InvalidInput(e.to_string()))
}

/// Write export bytes to `dir/file_name`, creating `dir` if needed
///
/// # Returns
/// * `Result<PathBuf, ExportError>` - The path written
pub fn write_export(
    dir: impl AsRef<Path>,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, bytes)?;
    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Student;
    use crate::store::AttendanceStore;

    fn marked_store() -> (AttendanceStore, String) {
        let mut class = Class::new("Data Structures", "CS201", "B", "Second Year");
        class.id = "cs201".to_string();
        class.students.push(Student::new("a", "Arjun, Jr.", "IIB2023001"));
        class.students.push(Student::new("b", "Neha", "IIB2023002"));
        let mut store = AttendanceStore::with_seed(vec![class]);

        let first = store.create_attendance_session("cs201").unwrap();
        store.mark_attendance("cs201", &first, "a", false).unwrap();
        let second = store.create_attendance_session("cs201").unwrap();
        store.mark_attendance("cs201", &second, "a", true).unwrap();
        let third = store.create_attendance_session("cs201").unwrap();
        store.mark_attendance("cs201", &third, "a", true).unwrap();
        (store, third)
    }

    #[test]
    fn test_summary_rows_count_all_sessions() {
        let (store, _) = marked_store();
        let rows = summary_rows(store.get_class_by_id("cs201").unwrap()).unwrap();

        assert_eq!(rows[0].attended, 2);
        assert_eq!(rows[0].total, 3);
        assert_eq!(rows[0].percentage, "67%");
        assert_eq!(rows[1].attended, 3);
        assert_eq!(rows[1].percentage, "100%");
    }

    #[test]
    fn test_summary_without_sessions_is_na() {
        let mut class = Class::new("Compilers", "CS501", "A", "Fifth Year");
        class.students.push(Student::new("a", "A", "R1"));
        let rows = summary_rows(&class).unwrap();
        assert_eq!(rows[0].total, 0);
        assert_eq!(rows[0].percentage, "N/A");
    }

    #[test]
    fn test_empty_roster_is_rejected() {
        let class = Class::new("Compilers", "CS501", "A", "Fifth Year");
        assert!(matches!(
            summary_rows(&class),
            Err(ExportError::NoStudents(_))
        ));
        assert!(matches!(
            summary_to_xlsx(&class),
            Err(ExportError::NoStudents(_))
        ));
    }

    #[test]
    fn test_file_names() {
        let (store, session_id) = marked_store();
        let class = store.get_class_by_id("cs201").unwrap();
        assert_eq!(
            summary_file_name(class).unwrap(),
            "Data_Structures_AttendanceSummary.xlsx"
        );

        let session = class.session(&session_id).unwrap();
        assert_eq!(
            session_file_name(class, session),
            format!("Data Structures_Attendance_{}.xlsx", session.date)
        );

        let unnamed = Class::new("  ", "CS0", "A", "First Year");
        assert!(matches!(
            summary_file_name(&unnamed),
            Err(ExportError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_csv_quotes_fields() {
        let (store, _) = marked_store();
        let csv = summary_to_csv(store.get_class_by_id("cs201").unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Name,RollNumber,Classes Attended,Total Classes,Attendance %"
        );
        assert_eq!(lines[1], "\"Arjun, Jr.\",IIB2023001,2,3,67%");
        assert_eq!(lines[2], "Neha,IIB2023002,3,3,100%");
    }

    #[test]
    fn test_session_rows_default_present() {
        let (mut store, session_id) = marked_store();
        store
            .enroll_students("cs201", vec![Student::new("c", "Late", "IIB2023003")])
            .unwrap();
        let class = store.get_class_by_id("cs201").unwrap();
        let rows = session_rows(class, class.session(&session_id).unwrap());

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.present));
        assert_eq!(rows[0].attendance_percentage, 67);
    }

    #[test]
    fn test_xlsx_exports_are_zip_archives() {
        let (store, session_id) = marked_store();
        let class = store.get_class_by_id("cs201").unwrap();

        let summary = summary_to_xlsx(class).unwrap();
        assert!(summary.starts_with(b"PK"));
        let session = session_to_xlsx(class, &session_id).unwrap();
        assert!(session.starts_with(b"PK"));
        assert!(matches!(
            session_to_xlsx(class, "sess-missing"),
            Err(ExportError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_read_class_rejects_missing_arrays() {
        let json = r#"{"id":"x","name":"X","course":"C","section":"A","year":"First Year"}"#;
        assert!(matches!(
            read_class(json.as_bytes()),
            Err(ExportError::InvalidInput(_))
        ));

        let (store, _) = marked_store();
        let original = store.get_class_by_id("cs201").unwrap();
        let encoded = serde_json::to_vec(original).unwrap();
        let decoded = read_class(encoded.as_slice()).unwrap();
        assert_eq!(&decoded, original);
    }

    #[test]
    fn test_write_export_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("exports");
        let path = write_export(&target, "out.csv", b"a,b\n").unwrap();
        assert_eq!(path, target.join("out.csv"));
        assert_eq!(fs::read(&path).unwrap(), b"a,b\n");
    }
}
