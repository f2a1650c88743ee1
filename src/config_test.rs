/// Tests for config module
#[cfg(test)]
mod tests {
    use crate::archive::ArchiveFormat;
    use crate::cli::{CliArgs, SearchOption};
    use crate::config::*;
    use crate::error::BatchError;
    use crate::types::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Args pointing at real (empty) input files inside `dir`
    fn args_in(dir: &Path) -> CliArgs {
        let template = dir.join("template.pptx");
        let data = dir.join("data.xlsx");
        fs::write(&template, b"").unwrap();
        fs::write(&data, b"").unwrap();

        CliArgs {
            template: Some(template),
            data: Some(data),
            sheet: None,
            output_dir: Some(dir.join("out")),
            search: None,
            start_row: Some(0),
            end_row: Some(2),
            store_ids: None,
            name_columns: vec![],
            match_mode: None,
            on_collision: None,
            archive: None,
            archive_path: None,
            convert_pdf: false,
            soffice: None,
            notify_endpoint: None,
            notify_to: vec![],
            notify_from: None,
            report_json: None,
            report_md: None,
            job: None,
            clean: false,
            console_width: None,
        }
    }

    #[test]
    fn test_defaults_from_minimal_args() {
        let dir = TempDir::new().unwrap();
        let plan = build_batch_plan(&args_in(dir.path())).unwrap();

        assert_eq!(plan.job.selection, Selection::RowRange { start: 0, end: 2 });
        assert_eq!(plan.job.match_mode, MatchMode::BracedSubstring);
        assert_eq!(plan.job.collision, CollisionPolicy::Overwrite);
        assert!(plan.job.file_name.is_empty());
        assert!(plan.job.output_dir.is_dir());
        assert!(plan.archive.is_none());
        assert!(plan.convert_pdf.is_none());
        assert!(plan.notify.is_none());
    }

    #[test]
    fn test_store_ids_are_trimmed_and_blanks_dropped() {
        assert_eq!(parse_store_ids(" S1, S7 ,,S12, "), vec!["S1", "S7", "S12"]);
        assert!(parse_store_ids(" , ").is_empty());
    }

    #[test]
    fn test_selection_inferred_from_store_ids() {
        let selection = resolve_selection(None, None, None, Some("S1,S2")).unwrap();
        assert_eq!(selection, Selection::KeyList(vec!["S1".into(), "S2".into()]));
    }

    #[test]
    fn test_selection_errors() {
        assert!(matches!(resolve_selection(None, None, None, None), Err(BatchError::Configuration(_))));
        assert!(matches!(
            resolve_selection(Some(SearchOption::Rows), Some(1), None, None),
            Err(BatchError::Configuration(_))
        ));
        assert!(matches!(
            resolve_selection(Some(SearchOption::Rows), Some(5), Some(4), None),
            Err(BatchError::Configuration(_))
        ));
        assert!(matches!(
            resolve_selection(Some(SearchOption::StoreId), None, None, Some(" , ")),
            Err(BatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_name_columns_mix_indices_and_names() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs { name_columns: vec!["0".into(), "City".into()], ..args_in(dir.path()) };
        let plan = build_batch_plan(&args).unwrap();

        assert_eq!(plan.job.file_name, vec![ColumnRef::Index(0), ColumnRef::Name("City".into())]);
    }

    #[test]
    fn test_missing_template_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs { template: Some(dir.path().join("nope.pptx")), ..args_in(dir.path()) };
        assert!(matches!(build_batch_plan(&args), Err(BatchError::Configuration(_))));
    }

    #[test]
    fn test_output_directory_is_created_and_canonical() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("a").join("..").join("b");
        let resolved = resolve_output_directory(&raw).unwrap();

        assert!(resolved.is_dir());
        assert_eq!(resolved, fs::canonicalize(dir.path().join("b")).unwrap());
    }

    #[test]
    fn test_output_directory_must_not_be_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(resolve_output_directory(&file), Err(BatchError::Configuration(_))));
    }

    #[test]
    fn test_tilde_expands_to_home() {
        if let Some(home) = dirs::home_dir() {
            let resolved = resolve_output_directory(Path::new("~")).unwrap();
            assert_eq!(resolved, fs::canonicalize(home).unwrap());
        }
    }

    #[test]
    fn test_job_file_supplies_defaults_and_cli_overrides() {
        let dir = TempDir::new().unwrap();
        let job_path = dir.path().join("job.toml");
        fs::write(
            &job_path,
            r#"
search_option = "store_id"
store_id = "S1, S2"
file_name_order = [0, "City"]
match_mode = "whole-text"
on_collision = "suffix"
archive = "tar-gz"
"#,
        )
        .unwrap();

        let args = CliArgs {
            start_row: None,
            end_row: None,
            job: Some(job_path),
            on_collision: Some(CollisionPolicy::Fail),
            ..args_in(dir.path())
        };
        let plan = build_batch_plan(&args).unwrap();

        assert_eq!(plan.job.selection, Selection::KeyList(vec!["S1".into(), "S2".into()]));
        assert_eq!(plan.job.file_name, vec![ColumnRef::Index(0), ColumnRef::Name("City".into())]);
        assert_eq!(plan.job.match_mode, MatchMode::WholeTextEquals);
        assert_eq!(plan.job.collision, CollisionPolicy::Fail);

        let (format, path) = plan.archive.unwrap();
        assert_eq!(format, ArchiveFormat::TarGz);
        assert_eq!(path, plan.job.output_dir.join("presentations.tar.gz"));
    }

    #[test]
    fn test_job_file_rejects_unknown_keys() {
        assert!(JobFile::parse("serach_option = \"rows\"").is_err());
    }

    #[test]
    fn test_notify_requires_recipients() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs { notify_endpoint: Some("http://localhost/send".into()), ..args_in(dir.path()) };
        assert!(matches!(build_batch_plan(&args), Err(BatchError::Configuration(_))));

        let args = CliArgs {
            notify_endpoint: Some("http://localhost/send".into()),
            notify_to: vec!["ops@example.com".into()],
            ..args_in(dir.path())
        };
        let mailer = build_batch_plan(&args).unwrap().notify.unwrap();
        assert_eq!(mailer.to, vec!["ops@example.com"]);
        assert_eq!(mailer.from, "deckmill@localhost");
    }

    #[test]
    fn test_convert_pdf_uses_soffice_override() {
        let dir = TempDir::new().unwrap();
        let args = CliArgs { convert_pdf: true, soffice: Some(PathBuf::from("/opt/lo/soffice")), ..args_in(dir.path()) };
        assert_eq!(build_batch_plan(&args).unwrap().convert_pdf, Some(PathBuf::from("/opt/lo/soffice")));
    }
}
