use crate::model::{Class, Draft, Student, TeachingAssistant};

const NAMES: [&str; 50] = [
    "Aditya", "Riya", "Aman", "Sneha", "Kunal", "Pooja", "Yash", "Simran", "Ravi", "Divya",
    "Arjun", "Neha", "Rahul", "Kriti", "Mohit", "Anjali", "Vikram", "Shreya", "Karan", "Priya",
    "Harsh", "Megha", "Nikhil", "Tanya", "Siddharth", "Isha", "Abhishek", "Sakshi", "Rajat",
    "Swati", "Nitesh", "Deepika", "Varun", "Ankita", "Manish", "Kavya", "Uday", "Aishwarya",
    "Ankit", "Radhika", "Gaurav", "Palak", "Parth", "Lavanya", "Sarthak", "Tanvi", "Rohit",
    "Bhavna", "Dev", "Aarushi",
];

/// Builds `count` students for a batch, cycling through the name list from `offset`.
///
/// Roll numbers are `{prefix}{batch_year}{n:03}` upper-cased, ids are `s-{prefix}-{n}`.
pub fn generate_students(batch_year: u32, count: usize, prefix: &str, offset: usize) -> Vec<Student> {
    (0..count)
        .map(|i| {
            let name = NAMES[(offset + i) % NAMES.len()];
            let roll = format!("{}{}{:03}", prefix, batch_year, i + 1);
            Student {
                id: format!("s-{}-{}", prefix, i + 1),
                name: format!("{} {}", name, batch_year),
                roll_number: roll.to_uppercase(),
                attendance_percentage: 100,
            }
        })
        .collect()
}

fn seeded_class(
    id: &str,
    name: &str,
    course: &str,
    section: &str,
    year: &str,
    students: Vec<Student>,
) -> Class {
    Class {
        id: id.to_string(),
        name: name.to_string(),
        course: course.to_string(),
        section: section.to_string(),
        year: year.to_string(),
        students,
        sessions: Vec::new(),
    }
}

/// The classes a fresh store starts with.
pub fn initial_classes() -> Vec<Class> {
    vec![
        seeded_class(
            "cs101",
            "Introduction to Programming",
            "CS101",
            "A",
            "First Year",
            generate_students(2024, 46, "iib", 0),
        ),
        seeded_class(
            "cs201",
            "Data Structures",
            "CS201",
            "B",
            "Second Year",
            generate_students(2023, 45, "iib", 10),
        ),
        seeded_class(
            "cs301",
            "Database Management",
            "CS301",
            "C",
            "Third Year",
            generate_students(2022, 60, "iib", 20),
        ),
        seeded_class(
            "cs401",
            "Operating Systems",
            "CS401",
            "D",
            "Fourth Year",
            generate_students(2021, 100, "iib", 30),
        ),
    ]
}

/// Students enrolled into a class that is opened with an empty roster.
pub fn demo_roster() -> Vec<Student> {
    vec![
        Student::new("IIB2024001", "Student 01", "IIB2024001"),
        Student::new("IIB2024002", "Student 02", "IIB2024002"),
        Student::new("IIB2024501", "Student 46", "IIB2024501"),
    ]
}

fn assistant(name: &str, email: &str, phone: &str) -> TeachingAssistant {
    TeachingAssistant {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
    }
}

/// Assistants every class lists until its own list is edited.
pub fn demo_teaching_assistants() -> Vec<TeachingAssistant> {
    vec![
        assistant("Rahul Sharma", "rahul@iiita.ac.in", "9876543210"),
        assistant("Priya Verma", "priya@iiita.ac.in", "9876543211"),
        assistant("Aditya Singh", "aditya@iiita.ac.in", "9876543212"),
    ]
}

pub fn demo_drafts() -> Vec<Draft> {
    [("1", "DBMS Attendance Draft"), ("2", "OS Lab Draft")]
        .into_iter()
        .map(|(id, name)| Draft {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}
