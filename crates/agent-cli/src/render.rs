//! Table rendering

use agent_stock::portfolio::{HoldingAnalysis, PortfolioReport};
use agent_stock::router::Route;
use agent_stock::synthesis::WeightedScoreResult;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn route_table(route: &Route) -> Table {
    let (min, max) = route.info.expected_time_seconds;
    let mut table = table(vec!["Path", "Producers", "Expected", "Description"]);
    table.add_row(vec![
        Cell::new(route.path),
        Cell::new(route.info.agents_used),
        Cell::new(format!("{min}-{max}s")),
        Cell::new(route.info.description),
    ]);
    if route.show_progress {
        table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new(""), Cell::new(&route.progress_message)]);
    }
    table
}

pub fn synthesis_table(result: &WeightedScoreResult) -> Table {
    let weights = result.weights;
    let mut table = table(vec!["Component", "Score", "Weight"]);
    table
        .add_row(vec![
            Cell::new("Fundamental"),
            Cell::new(result.fundamental_score),
            Cell::new(weights.fundamental),
        ])
        .add_row(vec![
            Cell::new("Technical"),
            Cell::new(result.technical_score),
            Cell::new(weights.technical),
        ])
        .add_row(vec![
            Cell::new("Sentiment"),
            Cell::new(result.sentiment_score),
            Cell::new(weights.sentiment),
        ])
        .add_row(vec![
            Cell::new("Risk (inverted)"),
            Cell::new(100 - result.risk_score.min(100)),
            Cell::new(weights.risk),
        ])
        .add_row(vec![
            Cell::new(format!("Weighted ({})", result.horizon)),
            Cell::new(result.weighted_average),
            Cell::new(""),
        ])
        .add_row(vec![
            Cell::new("Confidence adjustment"),
            Cell::new(format!("{:+}", result.confidence_adjustment)),
            Cell::new(""),
        ])
        .add_row(vec![
            Cell::new("Final"),
            Cell::new(result.final_score),
            Cell::new(""),
        ]);
    table
}

pub fn holdings_table(analyses: &[HoldingAnalysis]) -> Table {
    let mut table = table(vec![
        "Ticker", "P&L %", "Fund", "Tech", "Action", "Priority", "Reason",
    ]);
    for analysis in analyses {
        table.add_row(vec![
            Cell::new(&analysis.ticker),
            Cell::new(optional(analysis.pnl_percent)),
            Cell::new(optional(analysis.fundamental_score)),
            Cell::new(optional(analysis.technical_score)),
            Cell::new(analysis.action()),
            Cell::new(analysis.priority()),
            Cell::new(&analysis.decision.reason),
        ]);
    }
    table
}

pub fn portfolio_summary(report: &PortfolioReport) -> Table {
    let insights = &report.insights;
    let performers = |list: &[agent_stock::portfolio::Performer]| {
        list.iter()
            .map(|p| format!("{} ({:+.2}%)", p.ticker, p.pnl_percent))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut table = table(vec!["Portfolio", ""]);
    table
        .add_row(vec![Cell::new("Health"), Cell::new(insights.overall_health)])
        .add_row(vec![
            Cell::new("Invested"),
            Cell::new(format!("{:.2}", report.total_invested)),
        ])
        .add_row(vec![
            Cell::new("Value"),
            Cell::new(format!("{:.2}", report.total_value)),
        ])
        .add_row(vec![
            Cell::new("P&L"),
            Cell::new(format!(
                "{:.2} ({:+.2}%)",
                report.total_pnl, report.total_pnl_percent
            )),
        ])
        .add_row(vec![
            Cell::new("Urgent / High"),
            Cell::new(format!(
                "{} / {}",
                insights.urgent_actions, insights.high_priority_actions
            )),
        ])
        .add_row(vec![
            Cell::new("Action required"),
            Cell::new(insights.action_required_count),
        ])
        .add_row(vec![
            Cell::new("Best"),
            Cell::new(performers(&insights.best_performers)),
        ])
        .add_row(vec![
            Cell::new("Worst"),
            Cell::new(performers(&insights.worst_performers)),
        ]);
    table
}
