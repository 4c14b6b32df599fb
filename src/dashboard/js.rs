//! Dashboard JavaScript
//!
//! Client-side glue only: the worker renders every fragment, the script
//! posts the sync request, swaps `#content` and mounts Chart.js canvases.

pub const CHART_JS_CDN: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js";

pub const SCRIPT: &str = r#"
// ============================================================================
// State
// ============================================================================
let charts = [];

// ============================================================================
// Charts
// ============================================================================
function mountCharts() {
    charts.forEach(chart => chart.destroy());
    charts = [];
    if (typeof Chart === 'undefined') return;

    document.querySelectorAll('canvas[data-chart]').forEach(canvas => {
        try {
            charts.push(new Chart(canvas, JSON.parse(canvas.dataset.chart)));
        } catch (e) {
            console.error('Chart error:', e);
        }
    });
}

// ============================================================================
// Sync
// ============================================================================
function showError(message) {
    const el = document.getElementById('errorMsg');
    el.textContent = message;
    el.hidden = false;
}

function clearError() {
    const el = document.getElementById('errorMsg');
    el.textContent = '';
    el.hidden = true;
}

async function handleSync() {
    const btn = document.getElementById('syncButton');
    const fallback = document.getElementById('errorMsg').dataset.fallback;
    btn.disabled = true;
    btn.textContent = 'Synchronisation...';
    clearError();

    try {
        const res = await fetch('/dashboard/sync', { method: 'POST' });
        const data = await res.json();
        if (!res.ok || data.error) {
            throw new Error(data.error || ('HTTP ' + res.status));
        }
        document.getElementById('content').innerHTML = data.html;
        mountCharts();
    } catch (e) {
        console.error('Sync error:', e);
        showError(fallback);
    } finally {
        btn.disabled = false;
        btn.textContent = '🔄 Synchroniser';
    }
}

// ============================================================================
// Initialization
// ============================================================================
mountCharts();
"#;
