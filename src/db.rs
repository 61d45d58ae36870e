use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

use crate::model::{AnswerValue, RecordSet};

pub fn connect(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS students (
            student_id   TEXT NOT NULL,
            source       TEXT NOT NULL,
            start_year   INTEGER NOT NULL,
            extracted_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (student_id, source)
        );

        CREATE TABLE IF NOT EXISTS class_schedules (
            id           INTEGER PRIMARY KEY,
            student_id   TEXT NOT NULL,
            source       TEXT NOT NULL,
            year         INTEGER NOT NULL,
            quarter      TEXT NOT NULL CHECK(quarter IN ('A','1C','2C')),
            course_code  TEXT NOT NULL,
            course_name  TEXT NOT NULL,
            class_code   TEXT NOT NULL,
            branch       TEXT,
            schedules    TEXT,
            UNIQUE(student_id, source, year, quarter, course_code, class_code),
            FOREIGN KEY (student_id, source) REFERENCES students(student_id, source)
        );

        CREATE TABLE IF NOT EXISTS passed_courses (
            student_id   TEXT NOT NULL,
            source       TEXT NOT NULL,
            course_code  TEXT NOT NULL,
            passed       BOOLEAN NOT NULL,
            PRIMARY KEY (student_id, source, course_code),
            FOREIGN KEY (student_id, source) REFERENCES students(student_id, source)
        );

        CREATE TABLE IF NOT EXISTS survey_answers (
            id             INTEGER PRIMARY KEY,
            student_id     TEXT NOT NULL,
            source         TEXT NOT NULL,
            survey_kind    TEXT NOT NULL,
            year           INTEGER NOT NULL,
            quarter        TEXT NOT NULL,
            class_code     TEXT NOT NULL,
            course_code    TEXT NOT NULL,
            professor_name TEXT NOT NULL,
            question       TEXT NOT NULL,
            answer_type    TEXT NOT NULL CHECK(answer_type IN ('TEXT','PERCENTAGE')),
            text_value     TEXT,
            percent_value  INTEGER,
            UNIQUE(student_id, source, survey_kind, year, quarter, class_code, course_code, professor_name, question),
            FOREIGN KEY (student_id, source) REFERENCES students(student_id, source)
        );
        CREATE INDEX IF NOT EXISTS idx_answers_course ON survey_answers(course_code);
        ",
    )?;
    Ok(())
}

/// Store one extraction run, replacing what an earlier run stored for the
/// same student and source.
pub fn save_record_set(conn: &Connection, source: &str, records: &RecordSet) -> Result<()> {
    let student = records.student_id.as_str();
    let tx = conn.unchecked_transaction()?;
    {
        for table in ["class_schedules", "passed_courses", "survey_answers"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE student_id = ?1 AND source = ?2"),
                rusqlite::params![student, source],
            )?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO students (student_id, source, start_year) VALUES (?1, ?2, ?3)",
            rusqlite::params![student, source, records.start_year],
        )?;

        let mut c_stmt = tx.prepare(
            "INSERT OR REPLACE INTO class_schedules
             (student_id, source, year, quarter, course_code, course_name, class_code, branch, schedules)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for c in &records.class_schedules {
            let schedules = c
                .schedules
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            c_stmt.execute(rusqlite::params![
                student, source, c.year, c.quarter.code(), c.course_code, c.course_name,
                c.class_code, c.branch.map(|b| b.code()), schedules,
            ])?;
        }

        let mut p_stmt = tx.prepare(
            "INSERT OR REPLACE INTO passed_courses (student_id, source, course_code, passed)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for code in &records.passed_courses.signed {
            let passed = records.passed_courses.passed.contains(code);
            p_stmt.execute(rusqlite::params![student, source, code, passed])?;
        }

        let mut a_stmt = tx.prepare(
            "INSERT OR REPLACE INTO survey_answers
             (student_id, source, survey_kind, year, quarter, class_code, course_code,
              professor_name, question, answer_type, text_value, percent_value)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )?;
        for taken in &records.taken_surveys {
            let s = &taken.survey;
            let kind = serde_json::to_value(s.survey_kind)?;
            for answer in &taken.answers {
                let (answer_type, text, percent) = match &answer.value {
                    AnswerValue::Text(t) => ("TEXT", t.clone(), None),
                    AnswerValue::Percentage(p) => ("PERCENTAGE", None, *p),
                };
                a_stmt.execute(rusqlite::params![
                    student, source, kind.as_str(), s.year, s.quarter.code(), s.class_code,
                    s.course_code, s.professor_name, answer.question, answer_type, text, percent,
                ])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}
