//! Dashboard CSS styles
//!
//! Dark theme driven by CSS custom properties.

pub const STYLES: &str = r"
* { box-sizing: border-box; margin: 0; padding: 0; }

:root {
    --bg: #0d1117;
    --card: #161b22;
    --border: #30363d;
    --text: #c9d1d9;
    --text-dim: #8b949e;
    --green: #3fb950;
    --red: #f85149;
    --blue: #58a6ff;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: var(--bg);
    color: var(--text);
    padding: 20px;
    min-height: 100vh;
}

.container { max-width: 1200px; margin: 0 auto; }

header {
    display: flex;
    justify-content: space-between;
    align-items: center;
    margin-bottom: 20px;
    padding-bottom: 16px;
    border-bottom: 1px solid var(--border);
}

nav a { color: var(--blue); text-decoration: none; font-size: 14px; }

h1 { font-size: 24px; font-weight: 600; }

/* Sync */
.sync-section {
    display: flex;
    align-items: center;
    gap: 16px;
    margin-bottom: 24px;
}

.error-msg { color: var(--red); font-size: 14px; }

.hint { color: var(--text-dim); text-align: center; margin-top: 48px; }

/* Buttons */
.btn {
    padding: 8px 16px;
    border-radius: 6px;
    border: none;
    font-size: 13px;
    font-weight: 500;
    cursor: pointer;
    transition: all 0.2s;
}

.btn:disabled { opacity: 0.6; cursor: not-allowed; }
.btn-primary { background: var(--blue); color: #fff; }
.btn-primary:hover:not(:disabled) { background: #4c9aed; }

/* Layout */
.grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
    gap: 16px;
}

.charts-container { margin: 16px 0; }

.wide { grid-column: 1 / -1; }

/* Cards */
.card {
    background: var(--card);
    border: 1px solid var(--border);
    border-radius: 12px;
    padding: 20px;
}

.card-header {
    display: flex;
    justify-content: space-between;
    align-items: center;
    margin-bottom: 16px;
}

.card-title {
    font-size: 14px;
    color: var(--text-dim);
    text-transform: uppercase;
    letter-spacing: 0.5px;
}

.card-value { font-size: 28px; font-weight: 700; }
.card-detail { font-size: 14px; color: var(--text-dim); margin-top: 8px; }

.chart-canvas { max-height: 320px; }

.no-data { text-align: center; color: var(--text-dim); }

/* Colors */
.positive { color: var(--green); }
.negative { color: var(--red); }
.neutral { color: var(--text-dim); }

/* Holdings table */
.positions-table { width: 100%; border-collapse: collapse; }

.positions-table th,
.positions-table td {
    text-align: left;
    padding: 10px 8px;
    border-bottom: 1px solid var(--border);
}

.positions-table th {
    color: var(--text-dim);
    font-weight: 500;
    font-size: 12px;
    text-transform: uppercase;
}

.positions-table tr:last-child td { border-bottom: none; }

/* Tax summary */
.tax-info p { padding: 6px 0; font-size: 15px; }

@media (max-width: 600px) {
    .grid { grid-template-columns: 1fr; }
    .sync-section { flex-direction: column; align-items: flex-start; }
    .positions-table { font-size: 12px; }
}
";
