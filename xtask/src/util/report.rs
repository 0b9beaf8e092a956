//! Pass/fail report shared by every task.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Entry {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub task: &'static str,
    pub ok: bool,
    pub entries: Vec<Entry>,
}

impl Report {
    pub fn new(task: &'static str) -> Self {
        Self {
            task,
            ok: true,
            entries: Vec::new(),
        }
    }

    pub fn pass(&mut self, name: impl Into<String>, detail: Option<String>) {
        self.entries.push(Entry {
            name: name.into(),
            ok: true,
            detail,
        });
    }

    pub fn fail(&mut self, name: impl Into<String>, detail: impl Into<String>) {
        self.ok = false;
        self.entries.push(Entry {
            name: name.into(),
            ok: false,
            detail: Some(detail.into()),
        });
    }

    pub fn print(&self) {
        for entry in &self.entries {
            let tag = if entry.ok { "[OK]" } else { "[FAIL]" };
            match &entry.detail {
                Some(detail) => eprintln!("{tag} {}: {detail}", entry.name),
                None => eprintln!("{tag} {}", entry.name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_failure_fails_report() {
        let mut report = Report::new("check");
        report.pass("armv7a-none-eabi", None);
        assert!(report.ok);
        report.fail("thumbv6m-none-eabi", "built but should have been rejected");
        assert!(!report.ok);
        assert_eq!(report.entries.len(), 2);
    }

    #[test]
    fn test_json_omits_empty_detail() {
        let mut report = Report::new("doctor");
        report.pass("cargo", None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["name"], "cargo");
        assert!(json["entries"][0].get("detail").is_none());
    }
}
