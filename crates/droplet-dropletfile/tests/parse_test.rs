//! End-to-end tests for parsing Dropletfiles.

use droplet_dropletfile::error::InstructionError;
use droplet_dropletfile::expand::VariableExpander;
use droplet_dropletfile::instructions::KeyValuePair;
use droplet_dropletfile::{Instruction, parse, parse_reader};

const SAMPLE: &str = r#"# Build a small web service.
arg VERSION=1.4
arg REGISTRY

# base shared tooling
stage base
package --action=install curl \
    ca-certificates
env APP_HOME /srv/app LANG C.UTF-8
workdir /srv/$VERSION

stage app
copy --chown=app:app bin/ config/ /srv/app/
run ["/srv/app/bin/migrate", "--up"]
run echo "version $VERSION" > /srv/app/VERSION
cron 0 3 * * * /srv/app/bin/cleanup
expose 8080 443
label maintainer ops@example.com
user app
"#;

#[test]
fn sample_file_parses_into_stages() {
    let file = parse(SAMPLE).expect("sample should parse");
    assert_eq!(file.meta_args.len(), 2);

    let names: Vec<_> = file.stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["base", "app"]);
    assert_eq!(file.stages[0].comment.as_deref(), Some("shared tooling"));

    let base: Vec<_> = file.stages[0].instructions().iter().map(Instruction::name).collect();
    assert_eq!(base, vec!["package", "env", "workdir"]);

    let app: Vec<_> = file.stages[1].instructions().iter().map(Instruction::name).collect();
    assert_eq!(
        app,
        vec!["copy", "run", "run", "cron", "expose", "label", "user"]
    );
}

#[test]
fn continuation_lines_join_into_one_instruction() {
    let file = parse(SAMPLE).expect("sample should parse");
    let Instruction::Package(package) = &file.stages[0].instructions()[0] else {
        panic!("expected package");
    };
    assert_eq!(package.action, "install");
    assert_eq!(package.packages, vec!["curl", "ca-certificates"]);
    assert_eq!(package.base.location.start.line, 7);
    assert_eq!(package.base.location.end.line, 8);
}

#[test]
fn parsing_is_deterministic() {
    let first = parse(SAMPLE).expect("sample should parse");
    let second = parse(SAMPLE).expect("sample should parse");
    assert_eq!(first, second);
}

#[test]
fn reader_and_str_entry_points_agree() {
    let from_reader = parse_reader(SAMPLE.as_bytes()).expect("sample should parse");
    assert_eq!(from_reader, parse(SAMPLE).expect("sample should parse"));
}

#[test]
fn stage_names_fold_to_lower_case() {
    let file = parse("STAGE Build\nstage build").expect("should parse");
    assert_eq!(file.stages[0].name, "build");
    assert_eq!(file.stages[1].name, "build");
    assert!(file.stage("BUILD").is_some());
    assert!(file.stage("Build").is_some());
}

#[test]
fn ordering_is_preserved_or_sorted_per_instruction() {
    let file = parse("stage s\nenv a 1 b 2\nconfig /z /a\nexpose 80 22").expect("should parse");
    let [Instruction::Env(env), Instruction::Config(config), Instruction::Expose(expose)] =
        file.stages[0].instructions()
    else {
        panic!("unexpected instructions");
    };
    assert_eq!(
        env.env,
        vec![KeyValuePair::new("a", "1"), KeyValuePair::new("b", "2")]
    );
    assert_eq!(config.configs, vec!["/a", "/z"]);
    assert_eq!(expose.ports, vec!["22", "80"]);
}

#[test]
fn copy_arity_boundary() {
    let err = parse("stage s\ncopy src").expect_err("single path should fail");
    assert!(err.to_string().contains("Destination could not be determined"));
    assert_eq!(err.range().map(|r| r.start.line), Some(2));

    let file = parse("stage s\ncopy a b c").expect("should parse");
    let Instruction::Copy(copy) = &file.stages[0].instructions()[0] else {
        panic!("expected copy");
    };
    assert_eq!(copy.paths.sources, vec!["a", "b"]);
    assert_eq!(copy.paths.dest, "c");
}

#[test]
fn array_and_shell_forms_differ_only_in_shell_marker() {
    let file = parse("stage s\nrun echo hi\nrun [\"echo\",\"hi\"]").expect("should parse");
    let [Instruction::Run(shell), Instruction::Run(array)] = file.stages[0].instructions() else {
        panic!("expected two runs");
    };
    assert_eq!(shell.command.cmd_line, array.command.cmd_line);
    assert!(shell.command.prepend_shell);
    assert!(!array.command.prepend_shell);
}

#[test]
fn pre_stage_arguments() {
    let file = parse("arg FOO=bar\nstage build\nenv X 1").expect("should parse");
    assert_eq!(file.meta_args.len(), 1);
    assert_eq!(file.meta_args[0].args[0].key, "FOO");
    assert_eq!(file.meta_args[0].args[0].value.as_deref(), Some("bar"));
    assert_eq!(file.stages.len(), 1);
    assert_eq!(file.stages[0].instructions().len(), 1);

    let err = parse("env X 1\nstage build").expect_err("env before stage should fail");
    assert_eq!(err.instruction_error(), Some(&InstructionError::NoBuildStage));
    assert!(err.to_string().contains("no build stage in current context"));
}

#[test]
fn cron_arity() {
    let file = parse("stage s\ncron * * * * * echo hi").expect("should parse");
    let Instruction::Cron(cron) = &file.stages[0].instructions()[0] else {
        panic!("expected cron");
    };
    assert_eq!(cron.schedule(), "* * * * *");
    assert_eq!(cron.command.cmd_line, vec!["echo", "hi"]);

    assert!(parse("stage s\ncron * * * *").is_err());
}

#[test]
fn unknown_flag_names_flag_and_instruction() {
    let err = parse("stage s\ncopy --bogus=1 a b").expect_err("bogus flag should fail");
    let message = err.to_string();
    assert!(message.contains("bogus"));
    assert!(message.contains("COPY"));
    assert!(matches!(
        err.instruction_error(),
        Some(InstructionError::UnknownFlag { flag, instruction }) if flag == "bogus" && instruction == "copy"
    ));
}

#[test]
fn unknown_instruction_is_reported_with_line() {
    let err = parse("stage s\n\nFROM alpine").expect_err("from is not an instruction");
    assert_eq!(
        err.to_string(),
        "dropletfile parse error line 3: unknown instruction: FROM"
    );
}

#[test]
fn lexical_errors_abort_the_parse() {
    let err = parse("stage s\nrun [\"a\", \"b\"\nuser root").expect_err("open array should fail");
    assert!(err.instruction_error().is_none());
    assert_eq!(err.range().map(|r| r.start.line), Some(2));

    assert!(parse("stage s\nrun echo \\").is_err());
}

#[test]
fn identity_expansion_changes_nothing() {
    let original = parse(SAMPLE).expect("sample should parse");
    let mut expanded = original.clone();
    expanded
        .expand(|word| Ok::<_, std::convert::Infallible>(word.to_owned()))
        .expect("identity expansion");
    assert_eq!(original, expanded);
}

#[test]
fn meta_argument_expansion() {
    let mut file = parse(SAMPLE).expect("sample should parse");
    let vars = VariableExpander::from_meta_args(&file.meta_args);
    file.expand(|word| vars.expand_word(word))
        .expect("expansion should succeed");

    let Instruction::Workdir(workdir) = &file.stages[0].instructions()[2] else {
        panic!("expected workdir");
    };
    assert_eq!(workdir.path, "/srv/1.4");

    // run is never expanded
    let Instruction::Run(run) = &file.stages[1].instructions()[2] else {
        panic!("expected run");
    };
    assert!(run.command.cmd_line.iter().any(|w| w.contains("$VERSION")));
}

#[test]
fn json_carries_instruction_type() {
    let file = parse("arg A=1\nstage s\nenv X 1\nrun [\"true\"]").expect("should parse");
    let json = serde_json::to_value(&file).expect("should serialize");

    let instructions = &json["stages"][0]["instructions"];
    assert_eq!(instructions[0]["type"], "env");
    assert_eq!(instructions[0]["env"][0]["key"], "X");
    assert_eq!(instructions[1]["type"], "run");
    assert_eq!(instructions[1]["prepend_shell"], false);
    assert_eq!(json["stages"][0]["name"], "s");
    assert_eq!(json["meta_args"][0]["args"][0]["value"], "1");

    let back: droplet_dropletfile::Dropletfile =
        serde_json::from_value(json).expect("should deserialize");
    assert_eq!(back, file);
}
