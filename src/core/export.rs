//! # Result Export
//!
//! Writes each finished answer to
//! `<export_dir>/<DDMMYYYY>/research_<HHMMddmm>.txt`, with a short header
//! describing the run. Writes use a `.tmp` file and `rename()`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;

use crate::agent::{ResearchProgress, RunRequest};
use crate::core::state::App;

/// Everything that goes into one exported report.
pub struct Report<'a> {
    pub thread_id: &'a str,
    pub started_at: DateTime<Local>,
    pub request: &'a RunRequest,
    pub answer: &'a str,
    pub progress: Option<ResearchProgress>,
}

/// Why the research loop stopped, given the loop budget of the request.
pub fn completion_reason(progress: Option<ResearchProgress>, max_loops: u32) -> String {
    match progress {
        None => String::from("Unknown"),
        Some(p) if p.is_sufficient => String::from("Sufficient information"),
        Some(p) if p.loops_completed >= max_loops => {
            format!("Loop limit reached ({max_loops})")
        }
        Some(_) => String::from("Unknown reason"),
    }
}

impl Report<'_> {
    pub fn render(&self) -> String {
        let (initial_queries, max_loops) = self.request.effort.search_budget();
        format!(
            "Thread ID: {}\n\
             Start Time: {}\n\
             Query: {}\n\
             Effort: {}\n\
             Model: {}\n\
             Initial Queries: {}\n\
             Max Loops: {}\n\
             Actual Loops Completed: {}\n\
             Completion Reason: {}\n\n\
             --- Research Result ---\n\
             {}\n",
            self.thread_id,
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.request.query.trim(),
            self.request.effort.label(),
            self.request.model,
            initial_queries,
            max_loops,
            self.progress.map_or(0, |p| p.loops_completed),
            completion_reason(self.progress, max_loops),
            self.answer.trim_end(),
        )
    }

    /// `<dir>/<DDMMYYYY>/research_<HHMMddmm>.txt`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.started_at.format("%d%m%Y").to_string())
            .join(format!("research_{}.txt", self.started_at.format("%H%M%d%m")))
    }

    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = self.path_in(dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("txt.tmp");
        fs::write(&tmp, self.render())?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }
}

/// Export the answer of the run that just finished.
/// Returns `Ok(None)` when export is disabled or there is nothing to write.
pub fn save_result(app: &App) -> io::Result<Option<PathBuf>> {
    let (Some(dir), Some(request), Some(answer)) = (
        app.export_dir.as_deref(),
        app.last_request.as_ref(),
        app.last_ai_message(),
    ) else {
        return Ok(None);
    };

    let report = Report {
        thread_id: app.thread_id.as_deref().unwrap_or("unknown"),
        started_at: app.run_started_at.unwrap_or_else(Local::now),
        request,
        answer: &answer.content,
        progress: app.progress,
    };
    let path = report.write_to(dir)?;
    info!("Research saved to {}", path.display());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Effort, Message};
    use crate::test_support::test_app;
    use chrono::TimeZone;

    fn request() -> RunRequest {
        RunRequest {
            thread_id: Some("t1".into()),
            message_id: "h1".into(),
            query: "climate policy".into(),
            effort: Effort::High,
            model: "gemini-1.5-pro-latest".into(),
        }
    }

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 7, 9, 5, 0).unwrap()
    }

    #[test]
    fn report_header_and_body() {
        let req = request();
        let report = Report {
            thread_id: "t1",
            started_at: started(),
            request: &req,
            answer: "Carbon pricing works.\n\n",
            progress: Some(ResearchProgress {
                loops_completed: 3,
                is_sufficient: true,
            }),
        };
        let text = report.render();
        assert!(text.starts_with("Thread ID: t1\nStart Time: 2025-03-07 09:05:00\n"));
        assert!(text.contains("Effort: High\n"));
        assert!(text.contains(
            "Initial Queries: 5\nMax Loops: 10\nActual Loops Completed: 3\n\
             Completion Reason: Sufficient information\n\n"
        ));
        assert!(text.ends_with("--- Research Result ---\nCarbon pricing works.\n"));
    }

    #[test]
    fn report_path_uses_date_folder() {
        let req = request();
        let report = Report {
            thread_id: "t1",
            started_at: started(),
            request: &req,
            answer: "",
            progress: None,
        };
        assert_eq!(
            report.path_in(Path::new("/out")),
            PathBuf::from("/out/07032025/research_09050703.txt")
        );
    }

    #[test]
    fn completion_reason_branches() {
        let progress = |loops_completed, is_sufficient| {
            Some(ResearchProgress {
                loops_completed,
                is_sufficient,
            })
        };
        assert_eq!(completion_reason(progress(1, true), 10), "Sufficient information");
        assert_eq!(completion_reason(progress(10, false), 10), "Loop limit reached (10)");
        assert_eq!(completion_reason(progress(2, false), 10), "Unknown reason");
        assert_eq!(completion_reason(None, 10), "Unknown");
    }

    #[test]
    fn save_result_writes_last_answer() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app();
        app.export_dir = Some(dir.path().to_path_buf());
        app.thread_id = Some("t1".into());
        app.last_request = Some(request());
        app.run_started_at = Some(started());
        app.messages.push(Message::human("h1".into(), "climate policy".into()));
        app.messages.push(Message::ai(Some("a1".into()), "The answer.".into()));
        app.progress = Some(ResearchProgress {
            loops_completed: 10,
            is_sufficient: false,
        });

        let path = save_result(&app).unwrap().unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("Actual Loops Completed: 10\n"));
        assert!(written.contains("Completion Reason: Loop limit reached (10)\n"));
        assert!(written.contains("The answer."));
        assert!(!path.with_extension("txt.tmp").exists());
    }

    #[test]
    fn save_result_disabled_without_dir() {
        let mut app = test_app();
        app.last_request = Some(request());
        app.messages.push(Message::ai(Some("a1".into()), "x".into()));
        assert_eq!(save_result(&app).unwrap(), None);
    }
}
