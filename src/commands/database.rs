//! Database client and admin tools.
//!
//! Interactive shells are left alone; only inline statements (`psql -c`,
//! `mysql -e`, `mongosh --eval`, redis-cli arguments) and the drop helpers
//! are inspected.

use std::sync::LazyLock;

use regex::Regex;

use crate::commands::{Check, CommandValidator, deny, into_verdict, option_values, positional};
use crate::eval::{SegmentContext, ValidationVerdict};

static DESTRUCTIVE_SQL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bDROP\s+(?:DATABASE|SCHEMA|TABLE|INDEX|VIEW|FUNCTION|PROCEDURE|TRIGGER|USER|ROLE)\b",
        r"(?i)\bDROP\s+ALL\b",
        r"(?i)\bTRUNCATE\b",
        r"(?i)\bALTER\s+TABLE\s+\S+\s+DROP\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("destructive SQL pattern"))
    .collect()
});

/// `DELETE FROM table` up to the end of its statement.
static DELETE_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bDELETE\s+FROM\s+[^;]*").expect("delete pattern"));

static WHERE_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bWHERE\b").expect("where pattern"));

const MYSQLADMIN_DENIED: &[&str] = &["drop", "shutdown", "kill"];
const MYSQLADMIN_VALUE_FLAGS: &[&str] = &[
    "-h", "--host", "-P", "--port", "-u", "--user", "-S", "--socket",
];

const REDIS_DENIED: &[&str] = &[
    "FLUSHALL", "FLUSHDB", "DEBUG", "SHUTDOWN", "SLAVEOF", "REPLICAOF", "CONFIG",
];
const REDIS_VALUE_FLAGS: &[&str] = &["-h", "-p", "-a", "-n", "-u", "--user", "--pass", "-s"];

static DESTRUCTIVE_MONGO: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\.dropDatabase\s*\(",
        r"\.drop\s*\(",
        r"\.deleteMany\s*\(\s*\{\s*\}\s*\)",
        r"\.remove\s*\(\s*\{\s*\}\s*\)",
        r"\.dropAllUsers\s*\(",
        r"\.dropAllRoles\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("mongo pattern"))
    .collect()
});

/// Database and role names that look disposable.
static SAFE_DROP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:test|dev|local|tmp|temp|scratch|sandbox|mock)|_(?:test|dev|local|tmp|temp|mock)$")
        .expect("safe drop name pattern")
});

const DROP_VALUE_FLAGS: &[&str] = &[
    "-h", "-p", "-U", "--host", "--port", "--username", "--maintenance-db",
];

/// The first destructive construct in an SQL string, if any.
fn destructive_sql(sql: &str) -> Option<String> {
    if let Some(m) = DESTRUCTIVE_SQL.iter().find_map(|re| re.find(sql)) {
        return Some(m.as_str().to_string());
    }
    DELETE_STATEMENT
        .find_iter(sql)
        .find(|m| !WHERE_CLAUSE.is_match(m.as_str()))
        .map(|m| m.as_str().trim().to_string())
}

fn check_sql(tool: &str, statements: &[&str]) -> Check {
    for sql in statements {
        if let Some(found) = destructive_sql(sql) {
            return deny(format!("{tool} destructive SQL is not allowed: {found}"));
        }
    }
    Ok(())
}

fn check_psql(ctx: &SegmentContext) -> Check {
    let args = ctx.args()?;
    check_sql("psql", &option_values(args, "-c", "--command"))
}

fn check_mysql(ctx: &SegmentContext) -> Check {
    let args = ctx.args()?;
    check_sql(&ctx.base_command, &option_values(args, "-e", "--execute"))
}

fn check_mysqladmin(ctx: &SegmentContext) -> Check {
    let args = ctx.args()?;
    for word in positional(args, MYSQLADMIN_VALUE_FLAGS) {
        let lower = word.to_ascii_lowercase();
        if MYSQLADMIN_DENIED.contains(&lower.as_str()) {
            return deny(format!("mysqladmin {lower} is not allowed"));
        }
    }
    Ok(())
}

fn check_redis_cli(ctx: &SegmentContext) -> Check {
    let args = ctx.args()?;
    for word in positional(args, REDIS_VALUE_FLAGS) {
        let upper = word.to_ascii_uppercase();
        if REDIS_DENIED.contains(&upper.as_str()) {
            return deny(format!("redis-cli {upper} is not allowed"));
        }
    }
    Ok(())
}

fn check_mongosh(ctx: &SegmentContext) -> Check {
    let args = ctx.args()?;
    for script in option_values(args, "--eval", "--eval") {
        if let Some(m) = DESTRUCTIVE_MONGO.iter().find_map(|re| re.find(script)) {
            return deny(format!(
                "{} destructive operation is not allowed: {}",
                ctx.base_command,
                m.as_str()
            ));
        }
    }
    Ok(())
}

fn check_drop_helper(ctx: &SegmentContext) -> Check {
    let tool = ctx.base_command.as_str();
    let args = ctx.args()?;
    let names = positional(args, DROP_VALUE_FLAGS);
    if names.is_empty() {
        return deny(format!("{tool} requires a name"));
    }
    for name in names {
        if !SAFE_DROP_NAME.is_match(name) {
            return deny(format!(
                "{tool} only allowed for test/dev names, got: {name}"
            ));
        }
    }
    Ok(())
}

pub struct PsqlValidator;

impl CommandValidator for PsqlValidator {
    fn names(&self) -> &'static [&'static str] {
        &["psql"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_psql(ctx))
    }
}

pub struct MysqlValidator;

impl CommandValidator for MysqlValidator {
    fn names(&self) -> &'static [&'static str] {
        &["mysql", "mariadb"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_mysql(ctx))
    }
}

pub struct MysqladminValidator;

impl CommandValidator for MysqladminValidator {
    fn names(&self) -> &'static [&'static str] {
        &["mysqladmin"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_mysqladmin(ctx))
    }
}

pub struct RedisCliValidator;

impl CommandValidator for RedisCliValidator {
    fn names(&self) -> &'static [&'static str] {
        &["redis-cli"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_redis_cli(ctx))
    }
}

pub struct MongoshValidator;

impl CommandValidator for MongoshValidator {
    fn names(&self) -> &'static [&'static str] {
        &["mongosh", "mongo"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_mongosh(ctx))
    }
}

pub struct DropdbValidator;

impl CommandValidator for DropdbValidator {
    fn names(&self) -> &'static [&'static str] {
        &["dropdb"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_drop_helper(ctx))
    }
}

pub struct DropuserValidator;

impl CommandValidator for DropuserValidator {
    fn names(&self) -> &'static [&'static str] {
        &["dropuser"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_drop_helper(ctx))
    }
}

pub fn validate_psql_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_psql(&SegmentContext::from_segment(segment)))
}

pub fn validate_mysql_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_mysql(&SegmentContext::from_segment(segment)))
}

pub fn validate_mysqladmin_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_mysqladmin(&SegmentContext::from_segment(segment)))
}

pub fn validate_redis_cli_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_redis_cli(&SegmentContext::from_segment(segment)))
}

pub fn validate_mongosh_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_mongosh(&SegmentContext::from_segment(segment)))
}

pub fn validate_dropdb_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_drop_helper(&SegmentContext::from_segment(segment)))
}

pub fn validate_dropuser_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_drop_helper(&SegmentContext::from_segment(segment)))
}
