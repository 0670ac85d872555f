use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use defectlog_shared::{DrawCommand, Point, Scene};

fn radians(angle: f64) -> f64 {
    (angle - 90.0).to_radians()
}

fn fill_annulus(ctx: &CanvasRenderingContext2d, center: Point, inner: f64, outer: f64, fill: &str) {
    ctx.set_fill_style_str(fill);
    ctx.begin_path();
    let _ = ctx.arc(center.x, center.y, outer, 0.0, PI * 2.0);
    if inner > 0.0 {
        // Counter-clockwise inner circle leaves a hole under the nonzero rule.
        let _ = ctx.arc_with_anticlockwise(center.x, center.y, inner, PI * 2.0, 0.0, true);
    }
    ctx.fill();
}

fn wedge_path(
    ctx: &CanvasRenderingContext2d,
    center: Point,
    inner: f64,
    outer: f64,
    start: f64,
    end: f64,
) {
    let end = if end <= start { end + 360.0 } else { end };
    ctx.begin_path();
    let _ = ctx.arc(center.x, center.y, outer, radians(start), radians(end));
    if inner > 0.0 {
        let _ = ctx.arc_with_anticlockwise(
            center.x,
            center.y,
            inner,
            radians(end),
            radians(start),
            true,
        );
    } else {
        ctx.line_to(center.x, center.y);
    }
    ctx.close_path();
}

fn polygon_path(ctx: &CanvasRenderingContext2d, points: &[Point]) {
    ctx.begin_path();
    for (index, point) in points.iter().enumerate() {
        if index == 0 {
            ctx.move_to(point.x, point.y);
        } else {
            ctx.line_to(point.x, point.y);
        }
    }
    ctx.close_path();
}

fn fill_and_stroke(ctx: &CanvasRenderingContext2d, fill: &str, stroke: Option<&str>) {
    ctx.set_fill_style_str(fill);
    ctx.fill();
    if let Some(stroke) = stroke {
        ctx.set_stroke_style_str(stroke);
        ctx.set_line_width(2.0);
        ctx.stroke();
    }
}

pub fn draw_scene(ctx: &CanvasRenderingContext2d, scene: &Scene) {
    ctx.save();
    for command in &scene.commands {
        match command {
            DrawCommand::Clear {
                width,
                height,
                fill,
            } => {
                ctx.clear_rect(0.0, 0.0, *width, *height);
                ctx.set_fill_style_str(fill);
                ctx.fill_rect(0.0, 0.0, *width, *height);
            }
            DrawCommand::Annulus {
                center,
                inner,
                outer,
                fill,
            } => fill_annulus(ctx, *center, *inner, *outer, fill),
            DrawCommand::Wedge {
                center,
                inner,
                outer,
                start,
                end,
                fill,
                stroke,
            } => {
                wedge_path(ctx, *center, *inner, *outer, *start, *end);
                fill_and_stroke(ctx, fill, stroke.as_deref());
            }
            DrawCommand::Polygon {
                points,
                fill,
                stroke,
            } => {
                polygon_path(ctx, points);
                fill_and_stroke(ctx, fill, stroke.as_deref());
            }
            DrawCommand::Line {
                from,
                to,
                color,
                width,
            } => {
                ctx.set_stroke_style_str(color);
                ctx.set_line_width(*width);
                ctx.begin_path();
                ctx.move_to(from.x, from.y);
                ctx.line_to(to.x, to.y);
                ctx.stroke();
            }
            DrawCommand::Text {
                at,
                text,
                font,
                color,
            } => {
                ctx.set_font(font);
                ctx.set_fill_style_str(color);
                ctx.set_text_align("center");
                ctx.set_text_baseline("middle");
                let _ = ctx.fill_text(text, at.x, at.y);
            }
            DrawCommand::Marker {
                at,
                radius,
                fill,
                stroke,
            } => {
                ctx.begin_path();
                let _ = ctx.arc(at.x, at.y, *radius, 0.0, PI * 2.0);
                ctx.set_fill_style_str(fill);
                ctx.fill();
                ctx.set_stroke_style_str(stroke);
                ctx.set_line_width(2.0);
                ctx.stroke();
            }
        }
    }
    ctx.restore();
}
