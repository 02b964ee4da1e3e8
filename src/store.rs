use chrono::Utc;
use log::{debug, warn};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    AttendanceRecord, AttendanceSession, Class, Student, TakenBy, TeachingAssistant, percentage,
};
use crate::seed;

/// Handle returned by [`AttendanceStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Emitted to listeners after a mutation has been applied.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    ClassesReset,
    ClassAdded {
        class_id: String,
    },
    StudentsEnrolled {
        class_id: String,
        added: usize,
    },
    AssistantAdded {
        class_id: String,
    },
    SessionCreated {
        class_id: String,
        session_id: String,
    },
    AttendanceMarked {
        class_id: String,
        session_id: String,
        student_id: String,
        present: bool,
    },
}

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Owner of every class, session and student. All attendance reads and
/// writes go through here so derived percentages never go stale.
pub struct AttendanceStore {
    classes: Vec<Class>,
    seed: Vec<Class>,
    recorder: TakenBy,
    // Only classes whose list was edited have an entry
    assistants: HashMap<String, Vec<TeachingAssistant>>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl Default for AttendanceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AttendanceStore {
    /// A store populated with the built-in demo classes.
    pub fn new() -> Self {
        Self::with_seed(seed::initial_classes())
    }

    pub fn empty() -> Self {
        Self::with_seed(Vec::new())
    }

    /// A store whose [`fetch_classes`](Self::fetch_classes) resets to `seed`.
    pub fn with_seed(seed: Vec<Class>) -> Self {
        AttendanceStore {
            classes: seed.clone(),
            seed,
            recorder: TakenBy::default(),
            assistants: HashMap::new(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn recorder(&self) -> &TakenBy {
        &self.recorder
    }

    /// Identity stamped on sessions created from now on.
    pub fn set_recorder(&mut self, recorder: TakenBy) {
        self.recorder = recorder;
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, event: StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Replaces every class with a fresh copy of the seed. References into
    /// the previous collection do not survive this call.
    pub fn fetch_classes(&mut self) {
        self.classes = self.seed.clone();
        self.assistants.clear();
        debug!("Reset store to {} seeded classes", self.classes.len());
        self.notify(StoreEvent::ClassesReset);
    }

    pub fn get_class_by_id(&self, id: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Appends `class` as is. Ids must be unique; a duplicate is kept and
    /// shadowed by the earlier class on lookup.
    pub fn add_class(&mut self, class: Class) {
        if self.get_class_by_id(&class.id).is_some() {
            warn!("Adding class with duplicate id {}", class.id);
        }
        let class_id = class.id.clone();
        self.classes.push(class);
        debug!("Added class {}", class_id);
        self.notify(StoreEvent::ClassAdded { class_id });
    }

    fn class_index(&self, class_id: &str) -> Result<usize, StoreError> {
        self.classes
            .iter()
            .position(|c| c.id == class_id)
            .ok_or_else(|| {
                warn!("Unknown class {}", class_id);
                StoreError::ClassNotFound(class_id.to_string())
            })
    }

    /// Enrolls students not already on the roster, returning how many were added.
    pub fn enroll_students(
        &mut self,
        class_id: &str,
        students: Vec<Student>,
    ) -> Result<usize, StoreError> {
        let idx = self.class_index(class_id)?;
        let class = &mut self.classes[idx];

        let mut added = 0;
        for student in students {
            if class.students.iter().any(|s| s.id == student.id) {
                continue;
            }
            class.students.push(student);
            added += 1;
        }

        if added > 0 {
            debug!("Enrolled {} students into {}", added, class_id);
            self.notify(StoreEvent::StudentsEnrolled {
                class_id: class_id.to_string(),
                added,
            });
        }
        Ok(added)
    }

    /// Gives an empty class the demo roster. Classes with students are left alone.
    pub fn ensure_roster(&mut self, class_id: &str) -> Result<usize, StoreError> {
        let idx = self.class_index(class_id)?;
        if !self.classes[idx].students.is_empty() {
            return Ok(0);
        }
        self.enroll_students(class_id, seed::demo_roster())
    }

    /// Teaching assistants of a class; the demo list until one is added.
    pub fn teaching_assistants(
        &self,
        class_id: &str,
    ) -> Result<Vec<TeachingAssistant>, StoreError> {
        self.class_index(class_id)?;
        Ok(self
            .assistants
            .get(class_id)
            .cloned()
            .unwrap_or_else(seed::demo_teaching_assistants))
    }

    pub fn add_teaching_assistant(
        &mut self,
        class_id: &str,
        assistant: TeachingAssistant,
    ) -> Result<(), StoreError> {
        self.class_index(class_id)?;
        debug!("Adding assistant {} to {}", assistant.email, class_id);
        self.assistants
            .entry(class_id.to_string())
            .or_insert_with(seed::demo_teaching_assistants)
            .push(assistant);
        self.notify(StoreEvent::AssistantAdded {
            class_id: class_id.to_string(),
        });
        Ok(())
    }

    /// Starts a session dated today with every enrolled student marked present.
    /// The session goes to the front of the class's session list.
    pub fn create_attendance_session(&mut self, class_id: &str) -> Result<String, StoreError> {
        let idx = self.class_index(class_id)?;
        let session_id = format!("sess-{}", Uuid::new_v4());

        let class = &mut self.classes[idx];
        let session = AttendanceSession {
            id: session_id.clone(),
            date: Utc::now().date_naive(),
            taken_by: self.recorder.clone(),
            attendance_records: class
                .students
                .iter()
                .map(|student| AttendanceRecord {
                    student_id: student.id.clone(),
                    present: true,
                })
                .collect(),
        };
        class.sessions.insert(0, session);

        debug!("Created session {} for {}", session_id, class_id);
        self.notify(StoreEvent::SessionCreated {
            class_id: class_id.to_string(),
            session_id: session_id.clone(),
        });
        Ok(session_id)
    }

    /// The newest session of the class, created first if the class has none.
    pub fn open_session(&mut self, class_id: &str) -> Result<String, StoreError> {
        let idx = self.class_index(class_id)?;
        if let Some(session) = self.classes[idx].latest_session() {
            return Ok(session.id.clone());
        }
        self.create_attendance_session(class_id)
    }

    /// Sets one student's attendance for a session and refreshes their percentage.
    pub fn mark_attendance(
        &mut self,
        class_id: &str,
        session_id: &str,
        student_id: &str,
        present: bool,
    ) -> Result<(), StoreError> {
        let idx = self.class_index(class_id)?;
        let class = &mut self.classes[idx];

        let session_idx = class
            .sessions
            .iter()
            .position(|s| s.id == session_id)
            .ok_or_else(|| {
                warn!("Unknown session {} in {}", session_id, class_id);
                StoreError::SessionNotFound {
                    class_id: class_id.to_string(),
                    session_id: session_id.to_string(),
                }
            })?;

        let student_idx = class
            .students
            .iter()
            .position(|s| s.id == student_id)
            .ok_or_else(|| {
                warn!("Unknown student {} in {}", student_id, class_id);
                StoreError::StudentNotFound {
                    class_id: class_id.to_string(),
                    student_id: student_id.to_string(),
                }
            })?;

        class.sessions[session_idx].upsert(student_id, present);
        Self::recompute_percentage(class, student_idx);

        self.notify(StoreEvent::AttendanceMarked {
            class_id: class_id.to_string(),
            session_id: session_id.to_string(),
            student_id: student_id.to_string(),
            present,
        });
        Ok(())
    }

    /// Marks every enrolled student of the class in one session.
    pub fn mark_all(
        &mut self,
        class_id: &str,
        session_id: &str,
        present: bool,
    ) -> Result<(), StoreError> {
        let idx = self.class_index(class_id)?;
        if self.classes[idx].session(session_id).is_none() {
            return Err(StoreError::SessionNotFound {
                class_id: class_id.to_string(),
                session_id: session_id.to_string(),
            });
        }

        let student_ids: Vec<String> = self.classes[idx]
            .students
            .iter()
            .map(|s| s.id.clone())
            .collect();
        for student_id in student_ids {
            self.mark_attendance(class_id, session_id, &student_id, present)?;
        }
        Ok(())
    }

    // Rescans the whole session history; no running counters are kept.
    fn recompute_percentage(class: &mut Class, student_idx: usize) {
        let (present, total) = class.tally(&class.students[student_idx].id);
        if let Some(value) = percentage(present, total) {
            let student = &mut class.students[student_idx];
            student.attendance_percentage = value;
            debug!("{} now at {}% ({}/{})", student.id, value, present, total);
        }
    }
}
