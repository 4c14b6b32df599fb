//! Dashboard renderers
//!
//! Every view is a pure function of the data it is given and returns an
//! HTML fragment. Charts are emitted as `<canvas data-chart>` elements
//! carrying a Chart.js configuration; the page script mounts them.

use serde_json::{Value, json};

use crate::dashboard::action::SYNC_FAILED_MESSAGE;
use crate::dashboard::state::DashboardState;
use crate::portfolio::round_to;
use crate::types::{
    CashFlow, DistributionSlice, Holding, MonthlyProfit, Stats, Taxes, Transaction,
    TransactionHistory,
};

const NO_DATA: &str = "Aucune donnée";

const DISTRIBUTION_COLORS: [&str; 6] = [
    "#36A2EB", "#FF6384", "#FFCE56", "#4BC0C0", "#9966FF", "#c9cbcf",
];

const PROFIT_BAR_COLOR: &str = "#4caf50";

/// Escape text for HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn pnl_class(value: f64) -> &'static str {
    if value > 0.0 {
        "positive"
    } else if value < 0.0 {
        "negative"
    } else {
        "neutral"
    }
}

fn chart_card(title: &str, body: &str) -> String {
    format!(
        r#"<div class="card chart"><div class="card-header"><span class="card-title">{title}</span></div>{body}</div>"#
    )
}

fn placeholder_card(title: &str) -> String {
    chart_card(title, &format!(r#"<p class="no-data">{NO_DATA}</p>"#))
}

fn chart_canvas(config: &Value) -> String {
    format!(
        r#"<canvas class="chart-canvas" data-chart="{}"></canvas>"#,
        escape(&config.to_string())
    )
}

/// Holdings table
pub fn crypto_table(portfolio: &[Holding]) -> String {
    let rows = if portfolio.is_empty() {
        format!(r#"<tr><td colspan="6" class="no-data">{NO_DATA}</td></tr>"#)
    } else {
        portfolio
            .iter()
            .map(|h| {
                format!(
                    r#"<tr><td><strong>{asset}</strong></td><td>{qty}</td><td>{invested:.2}</td><td>{avg}</td><td class="{rc}">{realized:.2}</td><td class="{uc}">{unrealized:.2}</td></tr>"#,
                    asset = escape(&h.asset),
                    qty = h.quantity,
                    invested = h.total_invested,
                    avg = h.average_price,
                    rc = pnl_class(h.realized_profit),
                    realized = h.realized_profit,
                    uc = pnl_class(h.unrealized_profit),
                    unrealized = h.unrealized_profit,
                )
            })
            .collect::<String>()
    };

    format!(
        r#"<div class="card wide">
            <div class="card-header"><span class="card-title">Portefeuille par crypto</span></div>
            <table class="positions-table">
                <thead>
                    <tr>
                        <th>Crypto</th>
                        <th>Quantité</th>
                        <th>Investissement total (USD)</th>
                        <th>Prix moyen (USD)</th>
                        <th>Plus-value réalisée (USD)</th>
                        <th>Plus-value latente (USD)</th>
                    </tr>
                </thead>
                <tbody>{rows}</tbody>
            </table>
        </div>"#
    )
}

/// Current total value; shows zero until stats carry one. Invested capital
/// and the overall result follow when known.
pub fn portfolio_value_chart(stats: Option<&Stats>) -> String {
    let total = stats.and_then(|s| s.total_value).unwrap_or(0.0);
    let mut body = format!(r#"<p class="card-value">{total:.2} USD</p>"#);
    if let Some(invested) = stats.and_then(|s| s.invested) {
        body.push_str(&format!(
            r#"<p class="card-detail">Capital investi : {invested:.2} USD</p>"#
        ));
    }
    if let Some(profit) = stats.and_then(|s| s.overall_profit) {
        body.push_str(&format!(
            r#"<p class="card-detail">Résultat global : <span class="{}">{profit:.2} USD</span></p>"#,
            pnl_class(profit)
        ));
    }
    chart_card("Valeur du portefeuille", &body)
}

pub fn distribution_chart_config(distribution: &[DistributionSlice]) -> Value {
    let labels: Vec<&str> = distribution.iter().map(|d| d.asset.as_str()).collect();
    let values: Vec<f64> = distribution.iter().map(|d| d.value).collect();
    json!({
        "type": "pie",
        "data": {
            "labels": labels,
            "datasets": [{
                "data": values,
                "backgroundColor": DISTRIBUTION_COLORS,
                "hoverOffset": 4
            }]
        },
        "options": {
            "plugins": { "legend": { "position": "bottom" } }
        }
    })
}

/// Pie chart of value per asset
pub fn distribution_chart(stats: Option<&Stats>) -> String {
    const TITLE: &str = "Répartition du portefeuille";
    match stats.and_then(|s| s.distribution.as_deref()) {
        Some(distribution) => chart_card(TITLE, &chart_canvas(&distribution_chart_config(distribution))),
        None => placeholder_card(TITLE),
    }
}

pub fn monthly_profit_chart_config(months: &[MonthlyProfit]) -> Value {
    let labels: Vec<&str> = months.iter().map(|m| m.month.as_str()).collect();
    let values: Vec<String> = months.iter().map(|m| format!("{:.2}", m.profit)).collect();
    json!({
        "type": "bar",
        "data": {
            "labels": labels,
            "datasets": [{
                "label": "Profit mensuel (USD)",
                "data": values,
                "backgroundColor": PROFIT_BAR_COLOR
            }]
        },
        "options": {
            "plugins": { "legend": { "display": false } },
            "scales": {
                "x": { "title": { "display": true, "text": "Mois" } },
                "y": { "title": { "display": true, "text": "Plus-value (USD)" } }
            }
        }
    })
}

/// Bar chart of realized profit per month
pub fn monthly_profit_chart(stats: Option<&Stats>) -> String {
    const TITLE: &str = "Plus-values mensuelles";
    match stats.and_then(|s| s.monthly_profits.as_deref()) {
        Some(months) => chart_card(TITLE, &chart_canvas(&monthly_profit_chart_config(months))),
        None => placeholder_card(TITLE),
    }
}

/// `0.3` as `30`, `0.125` as `12.5`
fn percent_label(rate: f64) -> String {
    round_to(rate * 100.0, 2).to_string()
}

/// Yearly result and estimated tax; nothing without tax data
pub fn tax_info(taxes: Option<&Taxes>, tax_rate: f64) -> String {
    let Some(taxes) = taxes else {
        return String::new();
    };
    let label = if taxes.yearly_profit >= 0.0 {
        "Plus-values réalisées"
    } else {
        "Moins-values réalisées"
    };
    format!(
        r#"<div class="card wide tax-info">
            <div class="card-header"><span class="card-title">Bilan Fiscal {year}</span></div>
            <p>{label} en {year} : <strong class="{class}">{profit:.2} USD</strong></p>
            <p>Impôt estimé ({rate}%) : <strong>{tax:.2} USD</strong></p>
        </div>"#,
        rate = percent_label(tax_rate),
        year = taxes.year,
        class = pnl_class(taxes.yearly_profit),
        profit = taxes.yearly_profit,
        tax = taxes.estimated_tax,
    )
}

/// Sync button and error line
pub fn sync_section(state: &DashboardState) -> String {
    let disabled = if state.loading { " disabled" } else { "" };
    let error = state.error.as_deref().map(escape).unwrap_or_default();
    let hidden = if state.error.is_some() { "" } else { " hidden" };
    format!(
        r#"<div class="sync-section">
            <button id="syncButton" class="btn btn-primary" onclick="handleSync()"{disabled}>{label}</button>
            <p id="errorMsg" class="error-msg" data-fallback="{fallback}"{hidden}>{error}</p>
        </div>"#,
        label = state.sync_button_label(),
        fallback = escape(SYNC_FAILED_MESSAGE),
    )
}

/// Everything below the sync section
pub fn content(state: &DashboardState) -> String {
    if !state.loaded {
        return r#"<p class="hint">Cliquez sur « Synchroniser » pour charger les données de Binance.</p>"#
            .to_string();
    }
    let stats = state.stats.as_ref();
    format!(
        r#"{table}
        <div class="grid charts-container">
            {value}
            {distribution}
            {monthly}
        </div>
        {taxes}"#,
        table = crypto_table(&state.portfolio),
        value = portfolio_value_chart(stats),
        distribution = distribution_chart(stats),
        monthly = monthly_profit_chart(stats),
        taxes = tax_info(state.taxes.as_ref(), state.tax_rate),
    )
}

fn format_time(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn cash_flow_table(title: &str, flows: &[CashFlow]) -> String {
    let rows = if flows.is_empty() {
        format!(r#"<tr><td colspan="4" class="no-data">{NO_DATA}</td></tr>"#)
    } else {
        flows
            .iter()
            .map(|f| {
                format!(
                    "<tr><td>{time}</td><td><strong>{asset}</strong></td><td>{amount}</td><td>{value}</td></tr>",
                    time = format_time(f.time),
                    asset = escape(&f.asset),
                    amount = f.amount,
                    value = f.value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}")),
                )
            })
            .collect::<String>()
    };
    format!(
        r#"<div class="card wide">
            <div class="card-header"><span class="card-title">{title}</span></div>
            <table class="positions-table">
                <thead><tr><th>Date</th><th>Actif</th><th>Montant</th><th>Valeur (USD)</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </div>"#
    )
}

fn trade_table(trades: &[Transaction]) -> String {
    let rows = if trades.is_empty() {
        format!(r#"<tr><td colspan="5" class="no-data">{NO_DATA}</td></tr>"#)
    } else {
        trades
            .iter()
            .map(|t| {
                let side = if t.from_deposit {
                    "Dépôt"
                } else if t.is_convert {
                    "Conversion"
                } else if t.is_buyer {
                    "Achat"
                } else {
                    "Vente"
                };
                format!(
                    "<tr><td>{time}</td><td><strong>{symbol}</strong></td><td>{side}</td><td>{qty}</td><td>{quote:.2}</td></tr>",
                    time = format_time(t.time),
                    symbol = escape(&t.symbol),
                    qty = t.qty,
                    quote = t.quote_qty,
                )
            })
            .collect::<String>()
    };
    format!(
        r#"<div class="card wide">
            <div class="card-header"><span class="card-title">Transactions</span></div>
            <table class="positions-table">
                <thead><tr><th>Date</th><th>Paire</th><th>Type</th><th>Quantité</th><th>Montant (USD)</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </div>"#
    )
}

/// Deposits, withdrawals and trades of the last sync
pub fn transaction_history(history: Option<&TransactionHistory>) -> String {
    match history.filter(|h| !h.is_empty()) {
        Some(h) => format!(
            r#"<div class="grid">
            {deposits}
            {withdrawals}
            {trades}
        </div>"#,
            deposits = cash_flow_table("Dépôts", &h.deposits),
            withdrawals = cash_flow_table("Retraits", &h.withdrawals),
            trades = trade_table(&h.trades),
        ),
        None => r#"<p class="hint">Aucune donnée de transaction disponible. Veuillez synchroniser le portefeuille.</p>"#
            .to_string(),
    }
}
