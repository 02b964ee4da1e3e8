use crate::model::{Class, Student};

/// Students under this percentage are at risk.
pub const AT_RISK_BELOW: u8 = 75;
/// Students under this percentage (and not at risk) get a warning.
pub const WARNING_BELOW: u8 = 85;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttendanceBand {
    Good,
    Warning,
    AtRisk,
}

impl AttendanceBand {
    pub fn for_percentage(percentage: u8) -> Self {
        if percentage < AT_RISK_BELOW {
            AttendanceBand::AtRisk
        } else if percentage < WARNING_BELOW {
            AttendanceBand::Warning
        } else {
            AttendanceBand::Good
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttendanceBand::Good => "good",
            AttendanceBand::Warning => "warning",
            AttendanceBand::AtRisk => "at risk",
        }
    }
}

/// Summary figures for one class, computed from the stored percentages.
#[derive(Clone, Debug)]
pub struct ClassStats<'a> {
    /// Highest percentage first; ties keep roster order
    pub rankings: Vec<&'a Student>,
    pub highest: u8,
    pub lowest: u8,
    pub average: u8,
    pub total_sessions: usize,
    pub at_risk: Vec<&'a Student>,
}

impl<'a> ClassStats<'a> {
    pub fn compute(class: &'a Class) -> Self {
        let mut rankings: Vec<&Student> = class.students.iter().collect();
        rankings.sort_by(|a, b| b.attendance_percentage.cmp(&a.attendance_percentage));

        let highest = rankings.first().map_or(0, |s| s.attendance_percentage);
        let lowest = rankings.last().map_or(0, |s| s.attendance_percentage);

        let sum: u32 = rankings
            .iter()
            .map(|s| s.attendance_percentage as u32)
            .sum();
        let n = rankings.len() as u32;
        let average = if n == 0 {
            0
        } else {
            ((2 * sum + n) / (2 * n)) as u8
        };

        let at_risk = rankings
            .iter()
            .copied()
            .filter(|s| s.attendance_percentage < AT_RISK_BELOW)
            .collect();

        ClassStats {
            rankings,
            highest,
            lowest,
            average,
            total_sessions: class.sessions.len(),
            at_risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_with(percentages: &[u8]) -> Class {
        let mut class = Class::new("Networks", "CS402", "A", "Fourth Year");
        for (i, p) in percentages.iter().enumerate() {
            let id = format!("s{}", i);
            let mut student = Student::new(&id, &id, &id);
            student.attendance_percentage = *p;
            class.students.push(student);
        }
        class
    }

    #[test]
    fn test_bands() {
        assert_eq!(AttendanceBand::for_percentage(0), AttendanceBand::AtRisk);
        assert_eq!(AttendanceBand::for_percentage(74), AttendanceBand::AtRisk);
        assert_eq!(AttendanceBand::for_percentage(75), AttendanceBand::Warning);
        assert_eq!(AttendanceBand::for_percentage(84), AttendanceBand::Warning);
        assert_eq!(AttendanceBand::for_percentage(85), AttendanceBand::Good);
        assert_eq!(AttendanceBand::for_percentage(100).label(), "good");
    }

    #[test]
    fn test_stats_summary() {
        let class = class_with(&[80, 100, 50, 75]);
        let stats = ClassStats::compute(&class);

        let order: Vec<&str> = stats.rankings.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["s1", "s0", "s3", "s2"]);
        assert_eq!(stats.highest, 100);
        assert_eq!(stats.lowest, 50);
        // 305 / 4 = 76.25
        assert_eq!(stats.average, 76);
        assert_eq!(stats.at_risk.len(), 1);
        assert_eq!(stats.at_risk[0].id, "s2");
        assert_eq!(stats.total_sessions, 0);
    }

    #[test]
    fn test_average_rounds_half_up() {
        let class = class_with(&[50, 51]);
        assert_eq!(ClassStats::compute(&class).average, 51);
    }

    #[test]
    fn test_ties_keep_roster_order() {
        let class = class_with(&[90, 90, 90]);
        let stats = ClassStats::compute(&class);
        let order: Vec<&str> = stats.rankings.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["s0", "s1", "s2"]);
    }

    #[test]
    fn test_empty_class() {
        let class = class_with(&[]);
        let stats = ClassStats::compute(&class);
        assert_eq!((stats.highest, stats.lowest, stats.average), (0, 0, 0));
        assert!(stats.rankings.is_empty());
        assert!(stats.at_risk.is_empty());
    }
}
