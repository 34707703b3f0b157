//! Tests for statement printing and delimiter handling

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use sqldrift_core::{Instance, SessionParams};

use super::*;
use crate::ddl::{DirectStatement, ShellOutStatement};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn direct(host: &str, schema: &str, sql: &str, compound: bool) -> PlannedStatement {
    PlannedStatement::Direct(DirectStatement {
        instance: Instance::new(host, 3306, "root", None),
        schema: schema.to_string(),
        sql: sql.to_string(),
        params: SessionParams::new(),
        compound,
    })
}

fn shell_out(host: &str, schema: &str, command: &str) -> PlannedStatement {
    PlannedStatement::ShellOut(ShellOutStatement {
        command: command.to_string(),
        instance_id: format!("{host}:3306"),
        schema: schema.to_string(),
    })
}

#[test]
fn test_standard_printer_frames_instances_and_schemas() {
    let buf = SharedBuf::default();
    let printer = Printer::with_output(PrinterMode::Standard, Box::new(buf.clone()));

    printer.print_statement(&direct("db1", "app", "ALTER TABLE `t` ADD COLUMN `c` int", false));
    printer.print_statement(&direct("db1", "app", "DROP TABLE `old`", false));
    printer.print_statement(&direct("db1", "analytics", "CREATE TABLE `v` (`id` int)", false));
    printer.finish();

    let output = buf.contents();
    assert_eq!(
        output,
        "-- instance: db1:3306\n\
         USE `app`;\n\
         ALTER TABLE `t` ADD COLUMN `c` int;\n\
         DROP TABLE `old`;\n\
         USE `analytics`;\n\
         CREATE TABLE `v` (`id` int);\n"
    );
}

#[test]
fn test_compound_statements_switch_delimiters() {
    let buf = SharedBuf::default();
    let printer = Printer::with_output(PrinterMode::Standard, Box::new(buf.clone()));

    printer.print_statement(&direct(
        "db1",
        "app",
        "CREATE PROCEDURE `p`() BEGIN SELECT 1; END",
        true,
    ));
    printer.print_statement(&direct("db1", "app", "DROP TABLE `old`", false));
    printer.finish();

    let output = buf.contents();
    assert_eq!(
        output,
        "-- instance: db1:3306\n\
         USE `app`;\n\
         DELIMITER //\n\
         CREATE PROCEDURE `p`() BEGIN SELECT 1; END//\n\
         DELIMITER ;\n\
         DROP TABLE `old`;\n"
    );
}

#[test]
fn test_delimiter_restored_before_instance_change() {
    let buf = SharedBuf::default();
    let printer = Printer::with_output(PrinterMode::Standard, Box::new(buf.clone()));

    printer.print_statement(&direct(
        "db1",
        "app",
        "CREATE PROCEDURE `p`() BEGIN SELECT 1; END",
        true,
    ));
    printer.print_statement(&direct("db2", "app", "DROP TABLE `old`", false));
    printer.finish();

    let output = buf.contents();
    let delimiter_restore = output.find("DELIMITER ;").unwrap();
    let second_instance = output.find("-- instance: db2:3306").unwrap();
    assert!(delimiter_restore < second_instance);
}

#[test]
fn test_delimiter_restored_before_schema_change() {
    let buf = SharedBuf::default();
    let printer = Printer::with_output(PrinterMode::Standard, Box::new(buf.clone()));

    printer.print_statement(&direct(
        "db1",
        "app",
        "CREATE FUNCTION `f`() RETURNS int BEGIN RETURN 1; END",
        true,
    ));
    printer.print_statement(&direct("db1", "analytics", "DROP TABLE `old`", false));
    printer.finish();

    let output = buf.contents();
    let delimiter_restore = output.find("DELIMITER ;").unwrap();
    let schema_change = output.find("USE `analytics`;").unwrap();
    assert!(delimiter_restore < schema_change);
}

#[test]
fn test_finish_restores_trailing_delimiter() {
    let buf = SharedBuf::default();
    let printer = Printer::with_output(PrinterMode::Standard, Box::new(buf.clone()));

    printer.print_statement(&direct(
        "db1",
        "app",
        "CREATE PROCEDURE `p`() BEGIN SELECT 1; END",
        true,
    ));
    printer.finish();

    assert!(buf.contents().ends_with("DELIMITER ;\n"));
}

#[test]
fn test_shell_outs_print_without_delimiter() {
    let buf = SharedBuf::default();
    let printer = Printer::with_output(PrinterMode::Standard, Box::new(buf.clone()));

    printer.print_statement(&shell_out("db1", "app", "/usr/bin/osc --execute 'ALTER ...'"));
    printer.finish();

    let output = buf.contents();
    assert!(output.contains("\\! /usr/bin/osc --execute 'ALTER ...'\n"));
    assert!(!output.contains(";\n\\!"));
}

#[test]
fn test_brief_printer_emits_one_line_per_instance() {
    let buf = SharedBuf::default();
    let printer = Printer::with_output(PrinterMode::Brief, Box::new(buf.clone()));

    printer.print_statement(&direct("db1", "app", "DROP TABLE `a`", false));
    printer.print_statement(&direct("db1", "app", "DROP TABLE `b`", false));
    printer.print_statement(&direct("db2", "app", "DROP TABLE `c`", false));
    printer.finish();

    assert_eq!(buf.contents(), "db1:3306\ndb2:3306\n");
}
