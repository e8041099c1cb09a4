use axum::response::Html;

const INDEX_HTML: &str = r#"<html>
    <head>
        <title>Xamify API</title>
    </head>
    <body>
        <h1>Welcome to the Xamify API!</h1>
        <p>Use the /analyze endpoint to upload your syllabus and question papers.</p>
    </body>
</html>
"#;

/// GET /
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
