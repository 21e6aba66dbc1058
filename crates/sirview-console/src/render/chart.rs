use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style, Stylize},
    symbols::Marker,
    text::Line,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use sirview_state::HistoryBuffer;

use super::draw_placeholder;

/// `(step, count)` points for S, I and R, in history order.
pub fn series(history: &HistoryBuffer) -> [Vec<(f64, f64)>; 3] {
    let mut out: [Vec<(f64, f64)>; 3] = Default::default();
    for sample in history.iter() {
        let x = sample.step as f64;
        out[0].push((x, f64::from(sample.s)));
        out[1].push((x, f64::from(sample.i)));
        out[2].push((x, f64::from(sample.r)));
    }
    out
}

/// Line chart of the aggregate S/I/R counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsChart;

impl StatsChart {
    pub fn render(&self, frame: &mut Frame, area: Rect, history: &HistoryBuffer) {
        let (Some(first), Some(latest)) = (history.iter().next(), history.latest()) else {
            draw_placeholder(frame, area, " S / I / R ", "No statistics yet");
            return;
        };

        let [s, i, r] = series(history);
        let x_min = first.step as f64;
        let x_max = (latest.step as f64).max(x_min + 1.0);
        let y_max = history
            .iter()
            .map(|sample| sample.total() as f64)
            .fold(1.0, f64::max);

        let datasets = vec![
            Dataset::default()
                .name("Susceptible")
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Blue))
                .data(&s),
            Dataset::default()
                .name("Infected")
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Red))
                .data(&i),
            Dataset::default()
                .name("Recovered")
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Green))
                .data(&r),
        ];

        let title = format!(
            " S {}  I {}  R {}  ({} samples) ",
            latest.s,
            latest.i,
            latest.r,
            history.len()
        );
        let chart = Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL).title(title))
            .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)))
            .x_axis(
                Axis::default()
                    .title("step".dark_gray())
                    .bounds([x_min, x_max])
                    .labels(vec![
                        Line::from(format!("{}", first.step)),
                        Line::from(format!("{}", latest.step)),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("agents".dark_gray())
                    .bounds([0.0, y_max])
                    .labels(vec![Line::from("0"), Line::from(format!("{y_max:.0}"))]),
            );

        frame.render_widget(chart, area);
    }
}
