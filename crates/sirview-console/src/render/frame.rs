use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{
        canvas::{Canvas, Circle},
        Block, Borders,
    },
    Frame,
};

use sirview_protocol::{AgentStatus, Frame as SimFrame, AGENT_RADIUS, CANVAS_HEIGHT, CANVAS_WIDTH};

use super::draw_placeholder;

pub fn status_color(status: AgentStatus) -> Color {
    match status {
        AgentStatus::Susceptible => Color::Blue,
        AgentStatus::Infected => Color::Red,
        AgentStatus::Recovered => Color::Green,
    }
}

/// Draws one simulation frame onto a fixed logical canvas.
///
/// Simulation coordinates grow downward from the top-left corner; the
/// terminal canvas grows upward, so y is flipped.
#[derive(Debug, Clone, Copy)]
pub struct FrameRenderer {
    width: f64,
    height: f64,
    radius: f64,
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT, AGENT_RADIUS)
    }
}

impl FrameRenderer {
    pub fn new(width: f64, height: f64, radius: f64) -> Self {
        Self {
            width,
            height,
            radius,
        }
    }

    /// Draw `current` in world coordinates. The only mapping is a y flip,
    /// so that world y grows downward as on the service's canvas while the
    /// terminal canvas grows upward. No scaling or offset is applied.
    pub fn render(&self, frame: &mut Frame, area: Rect, current: Option<&SimFrame>) {
        let Some(sim) = current else {
            draw_placeholder(
                frame,
                area,
                " Simulation ",
                "No run loaded. Type /batch or /live to start.",
            );
            return;
        };

        let (s, i, r) = sim.tally();
        let title = format!(" Simulation  S {s}  I {i}  R {r} ");
        let (width, height, radius) = (self.width, self.height, self.radius);

        let canvas = Canvas::default()
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::White)),
            )
            .background_color(Color::Black)
            .marker(Marker::Braille)
            .x_bounds([0.0, width])
            .y_bounds([0.0, height])
            .paint(move |ctx| {
                for agent in &sim.agents {
                    ctx.draw(&Circle {
                        x: agent.x,
                        y: height - agent.y,
                        radius,
                        color: status_color(agent.status),
                    });
                }
                ctx.layer();
                ctx.print(
                    width * 0.02,
                    height * 0.96,
                    Line::styled(format!("Step {}", sim.step), Style::default().fg(Color::White)),
                );
            });

        frame.render_widget(canvas, area);
    }
}
