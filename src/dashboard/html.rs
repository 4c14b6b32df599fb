//! Dashboard page body
//!
//! Header with the sync control, then the `#content` area the script
//! replaces after every successful synchronization.

pub fn body(sync_section: &str, content: &str) -> String {
    format!(
        r#"
    <div class="container">
        <header>
            <h1>💼 Suivi d’investissement Crypto</h1>
            <nav><a href="/dashboard/transactions">Transactions</a></nav>
        </header>

        {sync_section}

        <main id="content">
        {content}
        </main>
    </div>
"#
    )
}

/// Transaction detail page; no sync control
pub fn transactions_body(history: &str) -> String {
    format!(
        r#"
    <div class="container">
        <header>
            <h1>📜 Transactions</h1>
            <nav><a href="/dashboard">← Tableau de bord</a></nav>
        </header>

        <main>
        {history}
        </main>
    </div>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_wraps_content() {
        let html = body("<button id=\"syncButton\"></button>", "<p>x</p>");
        assert!(html.contains(r#"<main id="content">"#));
        assert!(html.contains("syncButton"));
        assert!(html.contains("<p>x</p>"));
    }
}
