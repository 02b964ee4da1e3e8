#![cfg(not(tarpaulin_include))]

use attendance::auth::{AuthStore, ProfileUpdate};
use attendance::config::AppConfig;
use attendance::export;
use attendance::kv::KvStore;
use attendance::logger::init_logger;
use attendance::seed;
use attendance::{AttendanceBand, AttendanceStore, Class, ClassStats, TeachingAssistant};

use std::cell::Cell;
use std::fs::File;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Instant;

/// The class and session currently open at the prompt
struct Opened {
    class_id: String,
    session_id: String,
}

struct Console {
    store: AttendanceStore,
    auth: AuthStore,
    config: AppConfig,
    opened: Option<Opened>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    init_logger(&config.log_level);

    let auth = AuthStore::open(KvStore::open_or_reset(&config.kv_path)?)?;
    let mut store = AttendanceStore::new();
    if let Some(user) = auth.user() {
        store.set_recorder(user.as_recorder());
    }

    // Listeners fire on every applied mutation; redraw on the next prompt
    let redraw = Rc::new(Cell::new(true));
    let flag = Rc::clone(&redraw);
    store.subscribe(move |_| flag.set(true));

    let mut console = Console {
        store,
        auth,
        config,
        opened: None,
    };

    let mut start_time = Instant::now();
    let mut status = String::from("ok");
    let mut show = true;
    loop {
        if show && redraw.replace(false) {
            console.display();
        }

        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim();
        start_time = Instant::now();

        match command {
            "" => status = String::from("invalid command"),
            "q" => break,
            "help" => print_help(),
            "disable_output" => {
                show = false;
                status = String::from("ok");
            }
            "enable_output" => {
                show = true;
                redraw.set(true);
                status = String::from("ok");
            }
            _ => {
                status = console.handle(command);
                if command == "show" || command.starts_with("open ") {
                    redraw.set(true);
                }
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  q: Quit");
    println!("  login <email> <password>: Sign in");
    println!("  logout: Sign out");
    println!("  whoami: Show the signed-in user");
    println!("  profile <name|department> <value>: Update your profile");
    println!("  classes: List your classes");
    println!("  fetch: Reload the class list");
    println!("  add <course> <section> <year> <name...>: Add a class (quote words with spaces)");
    println!("  import <path>: Add a class from a JSON file");
    println!("  open <class_id>: Take attendance for a class");
    println!("  show: Redisplay the open class");
    println!("  search <term>: Find students by name or roll number");
    println!("  mark <roll|id> <p|a>: Mark one student");
    println!("  all <p|a>: Mark everyone");
    println!("  stats: Statistics for the open class");
    println!("  tas: Teaching assistants of the open class");
    println!("  add_ta <name> <email> <phone>: Add a teaching assistant");
    println!("  drafts: List saved attendance drafts");
    println!("  export | export_csv | export_session: Write spreadsheets");
    println!("  disable_output / enable_output: Toggle the roster display");
}

/// Splits on whitespace, keeping "double quoted" words together.
fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in input.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}

/// `<course> <section> <year> <name...>`, with the name taking every remaining word.
fn parse_class_args(input: &str) -> Option<Class> {
    let args = split_args(input);
    if args.len() < 4 {
        return None;
    }
    let name = args[3..].join(" ");
    Some(Class::new(&name, &args[0], &args[1], &args[2]))
}

fn parse_presence(flag: &str) -> Option<bool> {
    match flag {
        "p" | "present" => Some(true),
        "a" | "absent" => Some(false),
        _ => None,
    }
}

impl Console {
    fn handle(&mut self, command: &str) -> String {
        let (verb, rest) = match command.split_once(' ') {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (command, ""),
        };

        if verb == "login" {
            return self.login(rest);
        }
        if self.auth.require_user().is_err() {
            return String::from("login required");
        }

        match verb {
            "logout" => match self.auth.logout() {
                Ok(()) => {
                    self.opened = None;
                    String::from("ok")
                }
                Err(e) => e.to_string(),
            },
            "whoami" => {
                if let Some(user) = self.auth.user() {
                    println!(
                        "{} <{}> {:?}, {}",
                        user.name, user.email, user.role, user.department
                    );
                }
                String::from("ok")
            }
            "profile" => self.profile(rest),
            "classes" => {
                let classes = self.store.classes();
                println!(
                    "{} Active Course{}",
                    classes.len(),
                    if classes.len() != 1 { "s" } else { "" }
                );
                for class in classes {
                    println!(
                        "  {:<12} {:<8} Section {:<3} {:<12} {} ({} students, {} sessions)",
                        class.id,
                        class.course,
                        class.section,
                        class.year,
                        class.name,
                        class.students.len(),
                        class.sessions.len()
                    );
                }
                String::from("ok")
            }
            "fetch" => {
                self.store.fetch_classes();
                self.opened = None;
                String::from("ok")
            }
            "add" => self.add(rest),
            "import" => self.import(rest),
            "open" => self.open(rest),
            "show" => {
                if self.opened.is_some() {
                    String::from("ok")
                } else {
                    String::from("no class open")
                }
            }
            "search" => self.search(rest),
            "mark" => self.mark(rest),
            "all" => self.mark_all(rest),
            "stats" => self.stats(),
            "tas" => self.teaching_assistants(),
            "add_ta" => self.add_teaching_assistant(rest),
            "drafts" => {
                let drafts = seed::demo_drafts();
                println!(
                    "{} Drafted Attendance{}",
                    drafts.len(),
                    if drafts.len() != 1 { "s" } else { "" }
                );
                for draft in drafts {
                    println!("  {:<4} {}", draft.id, draft.name);
                }
                String::from("ok")
            }
            "export" | "export_csv" | "export_session" => self.export(verb),
            _ => String::from("invalid command"),
        }
    }

    fn login(&mut self, args: &str) -> String {
        let Some((email, password)) = args.split_once(' ') else {
            return String::from("usage: login <email> <password>");
        };
        match self.auth.login(email.trim(), password.trim()) {
            Ok(true) => {
                if let Some(user) = self.auth.user() {
                    self.store.set_recorder(user.as_recorder());
                    println!("Welcome, {}", user.name);
                }
                String::from("ok")
            }
            Ok(false) => String::from("invalid email or password"),
            Err(e) => e.to_string(),
        }
    }

    fn profile(&mut self, args: &str) -> String {
        let Some((field, value)) = args.split_once(' ') else {
            return String::from("usage: profile <name|department> <value>");
        };
        let value = value.trim().to_string();
        let update = match field {
            "name" => ProfileUpdate {
                name: Some(value),
                ..Default::default()
            },
            "department" => ProfileUpdate {
                department: Some(value),
                ..Default::default()
            },
            _ => return String::from("unknown profile field"),
        };
        match self.auth.update_profile(update) {
            Ok(()) => {
                if let Some(user) = self.auth.user() {
                    self.store.set_recorder(user.as_recorder());
                }
                String::from("ok")
            }
            Err(e) => e.to_string(),
        }
    }

    fn add(&mut self, args: &str) -> String {
        let Some(class) = parse_class_args(args) else {
            return String::from("usage: add <course> <section> <year> <name...>");
        };
        let class_id = class.id.clone();
        self.store.add_class(class);
        println!("Added {}", class_id);
        String::from("ok")
    }

    fn import(&mut self, path: &str) -> String {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => return e.to_string(),
        };
        match export::read_class(file) {
            Ok(class) => {
                self.store.add_class(class);
                String::from("ok")
            }
            Err(e) => e.to_string(),
        }
    }

    fn open(&mut self, class_id: &str) -> String {
        let opened = self
            .store
            .ensure_roster(class_id)
            .and_then(|_| self.store.open_session(class_id));
        match opened {
            Ok(session_id) => {
                self.opened = Some(Opened {
                    class_id: class_id.to_string(),
                    session_id,
                });
                String::from("ok")
            }
            Err(e) => e.to_string(),
        }
    }

    fn open_class(&self) -> Option<(&Class, &str)> {
        let opened = self.opened.as_ref()?;
        let class = self.store.get_class_by_id(&opened.class_id)?;
        Some((class, opened.session_id.as_str()))
    }

    fn search(&self, term: &str) -> String {
        let Some((class, session_id)) = self.open_class() else {
            return String::from("no class open");
        };
        let session = class.session(session_id);
        for student in class.search_students(term) {
            let present = session.is_none_or(|s| s.is_present(&student.id));
            println!(
                "  {:<12} {:<20} {:<8} {:>3}%",
                student.roll_number,
                student.name,
                if present { "present" } else { "absent" },
                student.attendance_percentage
            );
        }
        String::from("ok")
    }

    fn mark(&mut self, args: &str) -> String {
        let Some((who, flag)) = args.rsplit_once(' ') else {
            return String::from("usage: mark <roll|id> <p|a>");
        };
        let Some(present) = parse_presence(flag) else {
            return String::from("usage: mark <roll|id> <p|a>");
        };
        let Some((class, session_id)) = self.open_class() else {
            return String::from("no class open");
        };
        let who = who.trim();
        let Some(student) = class
            .students
            .iter()
            .find(|s| s.id == who || s.roll_number.eq_ignore_ascii_case(who))
        else {
            return String::from("no such student");
        };

        let (class_id, session_id, student_id) =
            (class.id.clone(), session_id.to_string(), student.id.clone());
        match self
            .store
            .mark_attendance(&class_id, &session_id, &student_id, present)
        {
            Ok(()) => String::from("ok"),
            Err(e) => e.to_string(),
        }
    }

    fn mark_all(&mut self, flag: &str) -> String {
        let Some(present) = parse_presence(flag) else {
            return String::from("usage: all <p|a>");
        };
        let Some(opened) = &self.opened else {
            return String::from("no class open");
        };
        match self
            .store
            .mark_all(&opened.class_id, &opened.session_id, present)
        {
            Ok(()) => String::from("ok"),
            Err(e) => e.to_string(),
        }
    }

    fn stats(&self) -> String {
        let Some((class, _)) = self.open_class() else {
            return String::from("no class open");
        };
        let stats = ClassStats::compute(class);
        println!("{} ({} - Section {})", class.name, class.course, class.section);
        println!(
            "Average {}%  Highest {}%  Lowest {}%  Sessions {}  At risk {}",
            stats.average,
            stats.highest,
            stats.lowest,
            stats.total_sessions,
            stats.at_risk.len()
        );
        for (rank, student) in stats.rankings.iter().enumerate() {
            let band = AttendanceBand::for_percentage(student.attendance_percentage);
            println!(
                "  {:>3}. {:<20} {:<12} {:>3}% {}",
                rank + 1,
                student.name,
                student.roll_number,
                student.attendance_percentage,
                band.label()
            );
        }
        String::from("ok")
    }

    fn teaching_assistants(&self) -> String {
        let Some(opened) = &self.opened else {
            return String::from("no class open");
        };
        match self.store.teaching_assistants(&opened.class_id) {
            Ok(tas) => {
                for ta in tas {
                    println!("  {:<20} {:<24} {}", ta.name, ta.email, ta.phone);
                }
                String::from("ok")
            }
            Err(e) => e.to_string(),
        }
    }

    fn add_teaching_assistant(&mut self, args: &str) -> String {
        let usage = "usage: add_ta <name> <email> <phone>";
        let args = split_args(args);
        let [name, email, phone] = args.as_slice() else {
            return String::from(usage);
        };
        let Some(opened) = &self.opened else {
            return String::from("no class open");
        };
        let assistant = TeachingAssistant {
            name: name.clone(),
            email: email.clone(),
            phone: phone.clone(),
        };
        match self.store.add_teaching_assistant(&opened.class_id, assistant) {
            Ok(()) => String::from("ok"),
            Err(e) => e.to_string(),
        }
    }

    fn export(&self, kind: &str) -> String {
        let Some((class, session_id)) = self.open_class() else {
            return String::from("no class open");
        };

        let written = match kind {
            "export" => export::summary_file_name(class).and_then(|name| {
                let bytes = export::summary_to_xlsx(class)?;
                export::write_export(&self.config.export_dir, &name, &bytes)
            }),
            "export_csv" => export::summary_file_name(class).and_then(|name| {
                let csv = export::summary_to_csv(class)?;
                let name = name.replace(".xlsx", ".csv");
                export::write_export(&self.config.export_dir, &name, csv.as_bytes())
            }),
            _ => match class.session(session_id) {
                Some(session) => export::session_to_xlsx(class, session_id).and_then(|bytes| {
                    let name = export::session_file_name(class, session);
                    export::write_export(&self.config.export_dir, &name, &bytes)
                }),
                None => return String::from("no session open"),
            },
        };

        match written {
            Ok(path) => {
                println!("Wrote {}", path.display());
                String::from("ok")
            }
            Err(e) => e.to_string(),
        }
    }

    fn display(&self) {
        let Some((class, session_id)) = self.open_class() else {
            return;
        };
        let Some(session) = class.session(session_id) else {
            return;
        };

        println!(
            "{} - {} Section {} | session {} taken by {}",
            class.course, class.name, class.section, session.date, session.taken_by.name
        );
        let present = class
            .students
            .iter()
            .filter(|s| session.is_present(&s.id))
            .count();
        println!("Present {} / {}", present, class.students.len());
        for student in &class.students {
            println!(
                "  [{}] {:<12} {:<20} {:>3}%",
                if session.is_present(&student.id) { "x" } else { " " },
                student.roll_number,
                student.name,
                student.attendance_percentage
            );
        }
    }
}
