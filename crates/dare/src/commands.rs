//! Command handlers
//!
//! Each command combines remote calls with the local store: the server is asked
//! first, and the store is only written once the remote side succeeded.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::cli::{Action, Commands, RobotCommand};
use crate::code::extract_code;
use crate::http::Transport;
use crate::period::Period;
use crate::resource::{Dare, Execution, ExecutionView, Periodical, PeriodicalView, Robot, RobotView};
use crate::store::{format_local_date, Store};

const MARGIN: &str = "    ";

fn millis_to_local_date(millis: i64) -> String {
    format_local_date(millis / 1000)
}

/// Read a robot definition from `file`, or standard input when absent
fn read_definition(file: Option<&Path>) -> Result<String> {
    let definition = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read robot from {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read robot from stdin")?;
            buffer
        }
    };
    Ok(definition.trim().to_string())
}

/// Runs commands against a store, a transport and an output sink
pub struct App<W: Write> {
    store: Store,
    transport: Transport,
    default_server: Option<String>,
    out: W,
}

impl<W: Write> App<W> {
    pub fn new(store: Store, transport: Transport, default_server: Option<String>, out: W) -> Self {
        Self {
            store,
            transport,
            default_server,
            out,
        }
    }

    pub fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Robot { command } => match command {
                RobotCommand::List { json } => self.list_robots(json),
                RobotCommand::Create { server, xml, file } => {
                    self.create_robot(server, xml, file.as_deref())
                }
                RobotCommand::Show {
                    code,
                    xml,
                    minilanguage,
                } => self.show_robot(&code, xml, minilanguage),
                RobotCommand::Delete { code } => self.delete_robot(&code),
                RobotCommand::Execute { code, inputs } => self.execute_robot(&code, &inputs),
                RobotCommand::CreatePeriodical {
                    code,
                    period,
                    inputs,
                } => self.create_periodical(&code, &period, &inputs),
            },
            Commands::Execution { action, code } => match action {
                Action::Show => self.show_execution(&code),
                Action::Delete => self.delete_execution(&code),
            },
            Commands::Periodical { action, code } => match action {
                Action::Show => self.show_periodical(&code),
                Action::Delete => self.delete_periodical(&code),
            },
            Commands::Execute {
                server,
                file,
                inputs,
            } => self.execute_once(server, file.as_deref(), &inputs),
        }
    }

    fn server(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.default_server.clone())
            .ok_or_else(|| anyhow!("No server given: use --server or set DARE_SERVER"))
    }

    fn not_found(&mut self, entity: &str, code: &str) -> Result<()> {
        writeln!(self.out, "Not Found {} with code {}", entity, code)?;
        Ok(())
    }

    fn list_robots(&mut self, json: bool) -> Result<()> {
        let robots = self.store.list_robots()?;

        if json {
            writeln!(self.out, "{}", serde_json::to_string_pretty(&robots)?)?;
            return Ok(());
        }

        for r in &robots {
            writeln!(self.out, "robot {}", r.code)?;
            writeln!(self.out, "Date:  {}", format_local_date(r.creation_time))?;
            writeln!(self.out, "{}", r.summary)?;
            if !r.executions.is_empty() {
                writeln!(self.out, "Executions:")?;
                for e in &r.executions {
                    writeln!(self.out, "{}execution {}", MARGIN, e.code)?;
                    writeln!(self.out, "{}Date: {}", MARGIN, format_local_date(e.creation_time))?;
                    writeln!(self.out, "{}Inputs: {}", MARGIN, e.inputs)?;
                }
            }
            if !r.periodicals.is_empty() {
                writeln!(self.out, "Periodicals:")?;
                for p in &r.periodicals {
                    writeln!(self.out, "{}periodical {}", MARGIN, p.code)?;
                    writeln!(self.out, "{}Date: {}", MARGIN, format_local_date(p.creation_time))?;
                    writeln!(self.out, "{}Inputs: {}", MARGIN, p.inputs)?;
                    writeln!(self.out, "{}Period: {}", MARGIN, p.period)?;
                }
            }
            writeln!(self.out, "{}", "-".repeat(70))?;
        }

        Ok(())
    }

    fn create_robot(
        &mut self,
        server: Option<String>,
        xml: bool,
        file: Option<&Path>,
    ) -> Result<()> {
        let server = self.server(server)?;
        let definition = read_definition(file)?;

        let dare = Dare::new(&server, &self.transport);
        let robot = if xml {
            dare.create_robot_from_xml(&definition)?
        } else {
            dare.create_robot(&definition)?
        };

        let code = self.store.add_robot(robot.url(), &definition)?;
        writeln!(self.out, "Robot with code {} created", code)?;
        Ok(())
    }

    fn show_robot(&mut self, code: &str, xml_only: bool, minilanguage_only: bool) -> Result<()> {
        let Some(url) = self.store.find_robot_url(code)? else {
            return self.not_found("robot", code);
        };
        let json = Robot::new(&url, &self.transport).show()?;
        let Some(json) = json else {
            return self.not_found("robot", code);
        };
        let view = RobotView::from_json(json)?;

        let show_all = !xml_only && !minilanguage_only;
        if show_all {
            writeln!(self.out, "robot {}", view.code)?;
            writeln!(self.out, "Date: {}", millis_to_local_date(view.creation_date_millis))?;
            writeln!(self.out, "XML:")?;
        }
        if show_all || xml_only {
            writeln!(self.out, "{}", view.robot_xml.as_deref().unwrap_or_default())?;
        }
        if show_all {
            writeln!(self.out, "Minilanguage:")?;
        }
        if show_all || minilanguage_only {
            writeln!(
                self.out,
                "{}",
                view.robot_in_minilanguage.as_deref().unwrap_or_default()
            )?;
        }
        Ok(())
    }

    fn delete_robot(&mut self, code: &str) -> Result<()> {
        let Some(url) = self.store.find_robot_url(code)? else {
            return self.not_found("robot", code);
        };
        Robot::new(&url, &self.transport).delete()?;
        self.store.delete_robot(code)?;
        writeln!(self.out, "Robot with code {} deleted along its executions", code)?;
        Ok(())
    }

    fn execute_robot(&mut self, code: &str, inputs: &[String]) -> Result<()> {
        let Some(url) = self.store.find_robot_url(code)? else {
            return self.not_found("robot", code);
        };
        let execution = Robot::new(&url, &self.transport).execute(inputs)?;
        let execution_code = self.store.add_execution(code, execution.url(), inputs)?;
        writeln!(self.out, "Execution with code {} created", execution_code)?;
        Ok(())
    }

    fn create_periodical(&mut self, code: &str, period: &Period, inputs: &[String]) -> Result<()> {
        let Some(url) = self.store.find_robot_url(code)? else {
            return self.not_found("robot", code);
        };
        let periodical = Robot::new(&url, &self.transport).periodical(period, inputs)?;
        let periodical_code =
            self.store
                .add_periodical(code, periodical.url(), &period.to_string(), inputs)?;
        writeln!(
            self.out,
            "Periodical execution with code {} created",
            periodical_code
        )?;
        Ok(())
    }

    fn write_execution(&mut self, code: &str, view: &ExecutionView) -> Result<()> {
        writeln!(self.out, "execution {}", code)?;
        writeln!(self.out, "Date: {}", millis_to_local_date(view.creation_date_millis))?;
        writeln!(self.out, "Execution time: {} ms", view.execution_time)?;
        if let Some(robot) = view.created_from.as_deref() {
            match extract_code(robot) {
                Ok(robot_code) => writeln!(self.out, "from robot {}", robot_code)?,
                Err(_) => writeln!(self.out, "from robot {}", robot)?,
            }
        }
        for line in &view.result_lines {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    fn show_execution(&mut self, code: &str) -> Result<()> {
        let Some(url) = self.store.find_execution_url(code)? else {
            return self.not_found("execution", code);
        };
        let json = Execution::new(&url, &self.transport).show()?;
        let Some(json) = json else {
            return self.not_found("execution", code);
        };
        let view = ExecutionView::from_json(json)?;
        self.write_execution(code, &view)
    }

    fn delete_execution(&mut self, code: &str) -> Result<()> {
        let Some(url) = self.store.find_execution_url(code)? else {
            return self.not_found("execution", code);
        };
        Execution::new(&url, &self.transport).delete()?;
        self.store.delete_execution(code)?;
        writeln!(self.out, "deleted execution: {}", code)?;
        Ok(())
    }

    fn show_periodical(&mut self, code: &str) -> Result<()> {
        let Some(url) = self.store.find_periodical_url(code)? else {
            return self.not_found("periodical execution", code);
        };
        let json = Periodical::new(&url, &self.transport).show()?;
        let Some(json) = json else {
            return self.not_found("periodical execution", code);
        };
        let view = PeriodicalView::from_json(json)?;

        writeln!(self.out, "periodical {}", code)?;
        writeln!(self.out, "Date: {}", millis_to_local_date(view.creation_date_millis))?;
        if let Some(robot) = view.robot.as_deref() {
            writeln!(self.out, "Robot: {}", robot)?;
        }
        if let Some(period) = view.period() {
            writeln!(self.out, "Period: {}", period)?;
        }
        writeln!(self.out, "Inputs: {}", view.inputs.join(", "))?;
        match &view.last_execution_result {
            Some(last) => {
                writeln!(self.out, "Last execution:")?;
                writeln!(
                    self.out,
                    "{}Date: {}",
                    MARGIN,
                    millis_to_local_date(last.creation_date_millis)
                )?;
                writeln!(self.out, "{}Execution time: {} ms", MARGIN, last.execution_time)?;
                for line in &last.result_lines {
                    writeln!(self.out, "{}{}", MARGIN, line)?;
                }
            }
            None => writeln!(self.out, "Not executed yet")?,
        }
        Ok(())
    }

    fn delete_periodical(&mut self, code: &str) -> Result<()> {
        let Some(url) = self.store.find_periodical_url(code)? else {
            return self.not_found("periodical execution", code);
        };
        Periodical::new(&url, &self.transport).delete()?;
        self.store.delete_periodical(code)?;
        writeln!(self.out, "periodical execution with code {} deleted", code)?;
        Ok(())
    }

    fn execute_once(
        &mut self,
        server: Option<String>,
        file: Option<&Path>,
        inputs: &[String],
    ) -> Result<()> {
        let server = self.server(server)?;
        let definition = read_definition(file)?;

        let execution = Dare::new(&server, &self.transport).execute(&definition, inputs)?;
        let code = extract_code(execution.url())?;
        let json = execution.show()?;
        let Some(json) = json else {
            return self.not_found("execution", &code);
        };
        let view = ExecutionView::from_json(json)?;
        self.write_execution(&code, &view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::*;
    use crate::http::Method;
    use tempfile::TempDir;

    const ROBOT_URL: &str = "http://x/robot/11111111-1111-1111-1111-111111111111";
    const ROBOT_CODE: &str = "11111111-1111-1111-1111-111111111111";
    const EXECUTION_URL: &str = "http://x/result/22222222-2222-2222-2222-222222222222";
    const EXECUTION_CODE: &str = "22222222-2222-2222-2222-222222222222";
    const PERIODICAL_URL: &str = "http://x/periodical/33333333-3333-3333-3333-333333333333";
    const PERIODICAL_CODE: &str = "33333333-3333-3333-3333-333333333333";

    struct Fixture {
        _tmp: TempDir,
        backend: ScriptedBackend,
        app: App<Vec<u8>>,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let store = Store::open(&tmp.path().join(".dare")).unwrap();
            let backend = ScriptedBackend::new();
            let (transport, _) = transport(&backend);
            let app = App::new(store, transport, Some("http://x".to_string()), Vec::new());
            Self {
                _tmp: tmp,
                backend,
                app,
            }
        }

        fn write_file(&self, name: &str, content: &str) -> std::path::PathBuf {
            let path = self._tmp.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }

        fn output(&mut self) -> String {
            String::from_utf8(std::mem::take(&mut self.app.out)).unwrap()
        }

        fn run(&mut self, command: Commands) {
            self.app.run(command).unwrap();
        }

        fn create_robot(&mut self, definition: &str) {
            let file = self.write_file("robot.mini", definition);
            self.backend.respond_created(ROBOT_URL);
            self.run(Commands::Robot {
                command: RobotCommand::Create {
                    server: None,
                    xml: false,
                    file: Some(file),
                },
            });
            self.output();
        }
    }

    #[test]
    fn test_create_robot_persists_code_url_and_summary() {
        let mut fx = Fixture::new();
        let definition = format!("url | patterns('{}')", "x".repeat(200));
        let file = fx.write_file("robot.mini", &format!("\n{}\n", definition));
        fx.backend.respond_created(ROBOT_URL);

        fx.run(Commands::Robot {
            command: RobotCommand::Create {
                server: Some("http://x/".to_string()),
                xml: false,
                file: Some(file),
            },
        });

        assert_eq!(fx.output(), format!("Robot with code {} created\n", ROBOT_CODE));
        assert_eq!(fx.backend.requests()[0].url, "http://x/robot/create");

        let robots = fx.app.store.list_robots().unwrap();
        assert_eq!(robots.len(), 1);
        assert_eq!(robots[0].code, ROBOT_CODE);
        assert_eq!(robots[0].url, ROBOT_URL);
        assert_eq!(robots[0].summary, definition.chars().take(100).collect::<String>());
    }

    #[test]
    fn test_failed_creation_persists_nothing() {
        let mut fx = Fixture::new();
        let file = fx.write_file("robot.xml", "<robot>");
        fx.backend.respond(400, "invalid robot");

        let result = fx.app.run(Commands::Robot {
            command: RobotCommand::Create {
                server: None,
                xml: true,
                file: Some(file),
            },
        });

        assert!(result.is_err());
        assert!(fx.app.store.list_robots().unwrap().is_empty());
    }

    #[test]
    fn test_create_requires_a_server() {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join(".dare")).unwrap();
        let backend = ScriptedBackend::new();
        let (transport, _) = transport(&backend);
        let mut app = App::new(store, transport, None, Vec::new());

        let result = app.run(Commands::Robot {
            command: RobotCommand::Create {
                server: None,
                xml: false,
                file: None,
            },
        });
        assert!(result.is_err());
        assert!(backend.requests().is_empty());
    }

    #[test]
    fn test_execute_and_list() {
        let mut fx = Fixture::new();
        fx.create_robot("url");
        fx.backend.respond_created(EXECUTION_URL).respond_created(PERIODICAL_URL);

        fx.run(Commands::Robot {
            command: RobotCommand::Execute {
                code: ROBOT_CODE.to_string(),
                inputs: vec!["a".to_string()],
            },
        });
        fx.run(Commands::Robot {
            command: RobotCommand::CreatePeriodical {
                code: ROBOT_CODE.to_string(),
                period: "2days".parse().unwrap(),
                inputs: vec![],
            },
        });
        assert_eq!(
            fx.output(),
            format!(
                "Execution with code {} created\nPeriodical execution with code {} created\n",
                EXECUTION_CODE, PERIODICAL_CODE
            )
        );

        let requests = fx.backend.requests();
        assert_eq!(requests[2].body.as_deref(), Some("period=2d"));

        fx.run(Commands::Robot {
            command: RobotCommand::List { json: false },
        });
        let listing = fx.output();
        assert!(listing.starts_with(&format!("robot {}\n", ROBOT_CODE)));
        assert!(listing.contains(&format!("    execution {}", EXECUTION_CODE)));
        assert!(listing.contains("    Inputs: [\"a\"]"));
        assert!(listing.contains(&format!("    periodical {}", PERIODICAL_CODE)));
        assert!(listing.contains("    Period: 2d"));
    }

    #[test]
    fn test_list_as_json() {
        let mut fx = Fixture::new();
        fx.create_robot("url");

        fx.run(Commands::Robot {
            command: RobotCommand::List { json: true },
        });
        let value: serde_json::Value = serde_json::from_str(&fx.output()).unwrap();
        assert_eq!(value[0]["code"], ROBOT_CODE);
        assert_eq!(value[0]["summary"], "url");
    }

    #[test]
    fn test_unknown_codes_are_reported() {
        let mut fx = Fixture::new();

        fx.run(Commands::Robot {
            command: RobotCommand::Execute {
                code: "nope".to_string(),
                inputs: vec![],
            },
        });
        fx.run(Commands::Execution {
            action: Action::Delete,
            code: "nope".to_string(),
        });
        fx.run(Commands::Periodical {
            action: Action::Show,
            code: "nope".to_string(),
        });

        assert_eq!(
            fx.output(),
            "Not Found robot with code nope\n\
             Not Found execution with code nope\n\
             Not Found periodical execution with code nope\n"
        );
        assert!(fx.backend.requests().is_empty());
    }

    #[test]
    fn test_show_robot_polls_and_prints() {
        let mut fx = Fixture::new();
        fx.create_robot("url");
        fx.backend.respond(204, "").respond(
            200,
            &serde_json::json!({
                "code": ROBOT_CODE,
                "creationDateMillis": 0,
                "robotXML": "<robot/>",
                "robotInMinilanguage": "url",
            })
            .to_string(),
        );

        fx.run(Commands::Robot {
            command: RobotCommand::Show {
                code: ROBOT_CODE.to_string(),
                xml: true,
                minilanguage: false,
            },
        });
        assert_eq!(fx.output(), "<robot/>\n");
    }

    #[test]
    fn test_show_robot_gone_remotely() {
        let mut fx = Fixture::new();
        fx.create_robot("url");
        fx.backend.respond(404, "");

        fx.run(Commands::Robot {
            command: RobotCommand::Show {
                code: ROBOT_CODE.to_string(),
                xml: false,
                minilanguage: false,
            },
        });
        assert_eq!(fx.output(), format!("Not Found robot with code {}\n", ROBOT_CODE));
    }

    #[test]
    fn test_delete_robot_remote_then_local() {
        let mut fx = Fixture::new();
        fx.create_robot("url");
        fx.backend.respond_created(EXECUTION_URL);
        fx.run(Commands::Robot {
            command: RobotCommand::Execute {
                code: ROBOT_CODE.to_string(),
                inputs: vec![],
            },
        });
        fx.output();
        fx.backend.respond(204, "");

        fx.run(Commands::Robot {
            command: RobotCommand::Delete {
                code: ROBOT_CODE.to_string(),
            },
        });

        assert_eq!(
            fx.output(),
            format!("Robot with code {} deleted along its executions\n", ROBOT_CODE)
        );
        let last = fx.backend.requests().pop().unwrap();
        assert_eq!(last.method, Method::Delete);
        assert_eq!(last.url, ROBOT_URL);
        assert!(fx.app.store.list_robots().unwrap().is_empty());
        assert!(fx.app.store.find_execution_url(EXECUTION_CODE).unwrap().is_none());
    }

    #[test]
    fn test_show_execution() {
        let mut fx = Fixture::new();
        fx.create_robot("url");
        fx.backend.respond_created(EXECUTION_URL);
        fx.run(Commands::Robot {
            command: RobotCommand::Execute {
                code: ROBOT_CODE.to_string(),
                inputs: vec![],
            },
        });
        fx.output();
        fx.backend.respond(
            200,
            &serde_json::json!({
                "creationDateMillis": 0,
                "executionTime": 42,
                "createdFrom": ROBOT_URL,
                "resultLines": ["first", "second"],
            })
            .to_string(),
        );

        fx.run(Commands::Execution {
            action: Action::Show,
            code: EXECUTION_CODE.to_string(),
        });

        let output = fx.output();
        assert!(output.starts_with(&format!("execution {}\n", EXECUTION_CODE)));
        assert!(output.contains("Execution time: 42 ms\n"));
        assert!(output.contains(&format!("from robot {}\n", ROBOT_CODE)));
        assert!(output.ends_with("first\nsecond\n"));
    }

    #[test]
    fn test_execute_once() {
        let mut fx = Fixture::new();
        let file = fx.write_file("robot.mini", "url");
        fx.backend.respond_created(EXECUTION_URL).respond(204, "").respond(
            200,
            &serde_json::json!({"executionTime": 1, "resultLines": ["done"]}).to_string(),
        );

        fx.run(Commands::Execute {
            server: None,
            file: Some(file),
            inputs: vec!["in".to_string()],
        });

        let output = fx.output();
        assert!(output.starts_with(&format!("execution {}\n", EXECUTION_CODE)));
        assert!(output.ends_with("done\n"));
        assert_eq!(fx.backend.requests()[0].body.as_deref(), Some("robot=url&input=in"));
        assert!(fx.app.store.list_robots().unwrap().is_empty());
    }

    #[test]
    fn test_delete_periodical() {
        let mut fx = Fixture::new();
        fx.create_robot("url");
        fx.backend.respond_created(PERIODICAL_URL);
        fx.run(Commands::Robot {
            command: RobotCommand::CreatePeriodical {
                code: ROBOT_CODE.to_string(),
                period: "1h".parse().unwrap(),
                inputs: vec![],
            },
        });
        fx.output();
        fx.backend.respond(200, "");

        fx.run(Commands::Periodical {
            action: Action::Delete,
            code: PERIODICAL_CODE.to_string(),
        });

        assert_eq!(
            fx.output(),
            format!("periodical execution with code {} deleted\n", PERIODICAL_CODE)
        );
        assert!(fx.app.store.find_periodical_url(PERIODICAL_CODE).unwrap().is_none());
    }
}
