// ==========================================
// 校验流程集成测试
// ==========================================
// 测试目标: 文件读取 → 列名归一化 → 字段校验 → 报告
// 覆盖: 分隔符探测、Latin-1 回退、配置覆写、列名冲突
// ==========================================


use data_upload::api::ApiError;
use data_upload::config::config_keys;
use data_upload::domain::types::{FailureKind, InferredType};
use data_upload::importer::ReadOptions;
use test_helpers::create_test_env;

#[test]
fn test_semicolon_csv_with_accented_headers_is_accepted() {
    let env = create_test_env().unwrap();
    let path = env.write_file(
        "produtos.csv",
        "Código;Nome;Preço;Categoria;Lançamento;Observação\n\
         A1;Teclado;9,90;eletronicos;15/01/2024;ok\n\
         B22;Mesa;1200,50;moveis;2024-02-01;\n",
    );

    let report = env
        .state
        .upload_api
        .validate_file(&path, "vendas", "produtos", &ReadOptions::default())
        .unwrap();

    assert!(report.accepted, "报告: {:?}", report.errors);
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.valid_rows, 2);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].canonical, "observacao");
    assert_eq!(
        report.column_mapping.canonical_names(),
        vec!["codigo", "nome", "preco", "categoria", "lancamento", "observacao"]
    );
}

#[test]
fn test_every_constraint_failure_is_reported() {
    let env = create_test_env().unwrap();
    let path = env.write_file(
        "produtos.csv",
        "codigo,nome,preco,categoria,lancamento\n\
         a1,X,-1,roupas,31/02/2024\n\
         C3,Cadeira,10.5,moveis,2024-03-01\n",
    );

    let report = env
        .state
        .upload_api
        .validate_file(&path, "vendas", "produtos", &ReadOptions::default())
        .unwrap();

    assert!(!report.accepted);
    assert_eq!(report.invalid_rows, 1);
    assert_eq!(report.valid_rows, 1);
    assert_eq!(report.total_failures, 5);
    assert!(report.errors.iter().all(|e| e.row_number == 1));

    let by_field = report.failures_by_field();
    for field in ["codigo", "nome", "preco", "categoria", "lancamento"] {
        assert_eq!(by_field.get(field), Some(&1), "字段 {} 应有一个错误", field);
    }

    let reason_of = |field: &str| {
        report
            .errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.reason.clone())
            .unwrap()
    };
    assert!(reason_of("codigo").contains("pattern="));
    assert!(reason_of("nome").contains("min_length=2"));
    assert!(reason_of("preco").contains("min_value=0"));
    assert!(reason_of("categoria").contains("allowed_values="));

    let date_error = report.errors.iter().find(|e| e.field == "lancamento").unwrap();
    assert_eq!(date_error.kind, FailureKind::TypeMismatch);
}

#[test]
fn test_missing_required_column_fails_every_row() {
    let env = create_test_env().unwrap();
    let path = env.write_file("produtos.csv", "codigo,nome\nA1,Teclado\nB2,Mouse\n");

    let report = env
        .state
        .upload_api
        .validate_file(&path, "vendas", "produtos", &ReadOptions::default())
        .unwrap();

    assert!(!report.accepted);
    assert_eq!(report.invalid_rows, 2);
    assert!(report
        .errors
        .iter()
        .all(|e| e.field == "preco" && e.kind == FailureKind::MissingRequired));
}

#[test]
fn test_missing_required_column_with_zero_rows_is_accepted() {
    let env = create_test_env().unwrap();
    let path = env.write_file("produtos.csv", "codigo,nome
");

    let report = env
        .state
        .upload_api
        .validate_file(&path, "vendas", "produtos", &ReadOptions::default())
        .unwrap();

    assert!(report.accepted);
    assert_eq!(report.total_rows, 0);
    assert!(report.errors.is_empty());
}

#[test]
fn test_row_with_more_values_than_headers_is_rejected() {
    let env = create_test_env().unwrap();
    let path = env.write_file(
        "produtos.csv",
        "codigo,nome,preco
A1,Teclado,10,PERDIDO,TAMBEM
",
    );

    let result = env.state.upload_api.validate_file(
        &path,
        "vendas",
        "produtos",
        &ReadOptions::default(),
    );

    match result {
        Err(ApiError::ImportError(msg)) => {
            assert!(msg.contains("produtos.csv"), "消息: {}", msg);
            assert!(msg.contains('5') && msg.contains('3'), "消息: {}", msg);
        }
        other => panic!("应为 ImportError，实际: {:?}", other.map(|r| r.accepted)),
    }
}

#[test]
fn test_latin1_file_is_decoded() {
    let env = create_test_env().unwrap();
    let path = env.dir.path().join("latin1.csv");
    std::fs::write(&path, b"C\xf3digo,Nome,Pre\xe7o\nA1,Caf\xe9,3.5\n").unwrap();

    let table = env
        .state
        .upload_api
        .read_file(&path, &ReadOptions::default())
        .unwrap();
    assert_eq!(table.headers[0], "Código");
    assert_eq!(table.rows[0][1], "Café");

    let report = env
        .state
        .upload_api
        .validate_table("vendas", "produtos", &table)
        .unwrap();
    assert!(report.accepted);
}

#[test]
fn test_duplicate_columns_abort_validation() {
    let env = create_test_env().unwrap();
    let path = env.write_file("produtos.csv", "codigo,Nome,nome ,preco\nA1,a,b,1\n");

    let result = env.state.upload_api.validate_file(
        &path,
        "vendas",
        "produtos",
        &ReadOptions::default(),
    );

    match result {
        Err(ApiError::DuplicateColumn { canonical, .. }) => assert_eq!(canonical, "nome"),
        other => panic!("应为 DuplicateColumn，实际: {:?}", other.map(|r| r.accepted)),
    }
}

#[test]
fn test_config_overrides_error_cap_and_date_formats() {
    let env = create_test_env().unwrap();
    let config = &env.state.config_manager;
    config
        .set_global_config_value(config_keys::MAX_REPORTED_ERRORS, "2")
        .unwrap();
    config
        .set_global_config_value(config_keys::DATE_FORMATS, r#"["%d.%m.%Y"]"#)
        .unwrap();

    let path = env.write_file(
        "produtos.csv",
        "codigo,nome,preco,lancamento\n\
         x1,Teclado,1,15.01.2024\n\
         x2,Mouse,1,16.01.2024\n\
         x3,Monitor,1,17.01.2024\n\
         x4,Cabo,1,18.01.2024\n",
    );

    let report = env
        .state
        .upload_api
        .validate_file(&path, "vendas", "produtos", &ReadOptions::default())
        .unwrap();

    assert_eq!(report.invalid_rows, 4);
    assert_eq!(report.total_failures, 4);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.suppressed_failures, 2);
    assert!(report.errors.iter().all(|e| e.field == "codigo"));
}

#[test]
fn test_unknown_category_is_reported() {
    let env = create_test_env().unwrap();
    let path = env.write_file("a.csv", "codigo\nA1\n");

    let result =
        env.state
            .upload_api
            .validate_file(&path, "vendas", "servicos", &ReadOptions::default());

    assert!(matches!(result, Err(ApiError::SchemaNotFound { .. })));
}

#[test]
fn test_preview_infers_column_types() {
    let env = create_test_env().unwrap();
    let path = env.write_file(
        "clientes.csv",
        "Nome,Idade,Ativo,Nascimento\nAna,30,sim,1994-05-01\nBia,41,não,1983-11-20\n",
    );

    let preview = env
        .state
        .upload_api
        .preview_file(&path, &ReadOptions::default())
        .unwrap();

    assert_eq!(preview.total_rows, 2);
    assert_eq!(preview.file_info.as_ref().unwrap().extension, "csv");
    let types: Vec<InferredType> = preview.columns.iter().map(|c| c.inferred_type).collect();
    assert_eq!(
        types,
        vec![
            InferredType::Text,
            InferredType::Integer,
            InferredType::Boolean,
            InferredType::Date
        ]
    );
}
