//! Dashboard module - portfolio web interface
//!
//! Server-rendered single page. The worker renders every fragment from a
//! [`DashboardState`]; the browser script only triggers synchronization and
//! mounts the charts.
//!
//! # Architecture
//! - `state.rs`: root state owned by the page
//! - `action.rs`: the sync action and the backend it talks to
//! - `views.rs`: table, charts and tax summary renderers
//! - `html.rs`, `css.rs`, `js.rs`: page shell

pub mod action;
mod css;
mod html;
mod js;
pub mod state;
pub mod views;

use state::DashboardState;

use crate::types::TransactionHistory;

const TITLE: &str = "Suivi d’investissement Crypto";

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="{chart_js}"></script>
    <style>
{css}
    </style>
</head>
<body>
{body}
    <script>
{js}
    </script>
</body>
</html>"#,
        chart_js = js::CHART_JS_CDN,
        css = css::STYLES,
        js = js::SCRIPT
    )
}

/// Generate the complete dashboard HTML page
pub fn dashboard_html(state: &DashboardState) -> String {
    page(
        TITLE,
        &html::body(&views::sync_section(state), &views::content(state)),
    )
}

/// Transaction detail page; `None` before the first sync
pub fn transactions_html(history: Option<&TransactionHistory>) -> String {
    page(
        &format!("Transactions - {TITLE}"),
        &html::transactions_body(&views::transaction_history(history)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_page_shows_hint_and_trigger() {
        let page = dashboard_html(&DashboardState::default());
        assert!(page.contains("Suivi d’investissement Crypto"));
        assert!(page.contains("🔄 Synchroniser"));
        assert!(page.contains("Cliquez sur « Synchroniser »"));
        assert!(page.contains("handleSync"));
        assert!(page.contains("chart.umd.min.js"));
        assert!(page.contains(r#"href="/dashboard/transactions""#));
    }

    #[test]
    fn test_transactions_page_before_sync() {
        let page = transactions_html(None);
        assert!(page.contains("<title>Transactions - Suivi d’investissement Crypto</title>"));
        assert!(page.contains("Aucune donnée de transaction disponible"));
        assert!(page.contains(r#"href="/dashboard""#));
    }
}
