//! Plain-text and CSV output of a solved timetable.
use std::io::Write;

use timetable_core::decode::session_label;
use timetable_core::decode::Cell;
use timetable_core::decode::Lesson;
use timetable_core::decode::Occupancy;
use timetable_core::decode::Timetable;
use timetable_core::decode::ValidationReport;
use timetable_core::domain::Domain;
use timetable_core::domain::SlotId;
use timetable_core::scheduler::SolveMetadata;

const BATCH_HEADER: &str = "Batch";

pub(crate) fn lesson_text(lesson: &Lesson) -> String {
    let teachers = lesson
        .teachers
        .iter()
        .map(|teacher| teacher.as_str())
        .collect::<Vec<_>>()
        .join("/");
    let mut text = format!("{} - {teachers}", lesson.subject);
    if lesson.occupancy == Occupancy::Double {
        text.push_str(&format!(" ({})", session_label(lesson.occupancy)));
    }
    text
}

fn cell_text(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::Lesson(lesson)) => lesson_text(lesson),
        Some(Cell::Free) => "-".to_owned(),
        Some(Cell::Lunch) => "LUNCH BREAK".to_owned(),
        Some(Cell::Blocked) | None => "BLOCKED".to_owned(),
    }
}

/// One table per building, with a row per batch and a column per slot of the grid.
pub(crate) fn write_timetable(
    out: &mut impl Write,
    domain: &Domain,
    timetable: &Timetable,
) -> std::io::Result<()> {
    let slots = domain
        .slots
        .iter()
        .map(|(slot, time_slot)| (slot, time_slot.label.as_str()))
        .collect::<Vec<(SlotId, &str)>>();

    for building in &domain.buildings {
        let batches = domain
            .batches
            .iter()
            .filter(|batch| &batch.building == building)
            .collect::<Vec<_>>();
        if batches.is_empty() {
            continue;
        }

        let header = std::iter::once(BATCH_HEADER.to_owned())
            .chain(slots.iter().map(|(_, label)| (*label).to_owned()))
            .collect::<Vec<_>>();
        let rows = batches
            .iter()
            .map(|batch| {
                std::iter::once(batch.id.to_string())
                    .chain(
                        slots
                            .iter()
                            .map(|(slot, _)| cell_text(timetable.cell(&batch.id, *slot))),
                    )
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let mut widths = header.iter().map(String::len).collect::<Vec<_>>();
        for row in &rows {
            for (width, text) in widths.iter_mut().zip(row) {
                *width = (*width).max(text.len());
            }
        }

        writeln!(out, "{building}")?;
        write_row(out, &header, &widths)?;
        let rule = widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(out, "{rule}")?;
        for row in &rows {
            write_row(out, row, &widths)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_row(out: &mut impl Write, row: &[String], widths: &[usize]) -> std::io::Result<()> {
    let cells = row
        .iter()
        .zip(widths)
        .map(|(text, width)| format!("{text:<width$}"))
        .collect::<Vec<_>>();
    writeln!(out, "{}", cells.join(" | ").trim_end())
}

pub(crate) fn write_report(out: &mut impl Write, report: &ValidationReport) -> std::io::Result<()> {
    writeln!(out, "Validation")?;
    write!(out, "{report}")?;
    if report.passed() {
        writeln!(out, "All invariants hold.")
    } else {
        writeln!(out, "Failed: {}", report.summary())
    }
}

pub(crate) fn write_metadata(out: &mut impl Write, metadata: &SolveMetadata) -> std::io::Result<()> {
    writeln!(out, "Solver status: {}", metadata.status)?;
    writeln!(out, "Solver statistics: {}", metadata.statistics)?;
    writeln!(
        out,
        "Adjacency score: {} of at most {}",
        metadata.adjacency_score, metadata.max_adjacency_score
    )?;
    writeln!(out, "Model: {}", metadata.model)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

/// One line per placed lesson, with the columns `Batch,Time_Slot,Subject,Teacher`.
pub(crate) fn write_csv(
    out: &mut impl Write,
    domain: &Domain,
    timetable: &Timetable,
) -> std::io::Result<()> {
    writeln!(out, "Batch,Time_Slot,Subject,Teacher")?;
    for (batch, slot, lesson) in timetable.lessons() {
        let mut subject = lesson.subject.to_string();
        if lesson.occupancy == Occupancy::Double {
            subject.push_str(&format!(" ({})", session_label(lesson.occupancy)));
        }
        let teachers = lesson
            .teachers
            .iter()
            .map(|teacher| teacher.as_str())
            .collect::<Vec<_>>()
            .join("/");
        writeln!(
            out,
            "{},{},{},{}",
            csv_field(batch.as_str()),
            csv_field(&domain.slots.label(slot)),
            csv_field(&subject),
            csv_field(&teachers)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use timetable_core::domain::Batch;
    use timetable_core::domain::Session;
    use timetable_core::domain::SlotGrid;
    use timetable_core::domain::SlotKind;
    use timetable_core::domain::SubjectId;
    use timetable_core::domain::TeacherId;
    use timetable_core::domain::TimeSlot;

    use super::*;

    fn sample() -> (Domain, Timetable) {
        let mut domain = Domain::new(SlotGrid::new(vec![
            TimeSlot::new("8:30-10:00", SlotKind::Working),
            TimeSlot::new("1:00-2:00", SlotKind::Lunch),
            TimeSlot::new("5:30-7:00", SlotKind::DoubleWeight),
        ]));
        domain.buildings = vec!["Building_1".into(), "Building_2".into()];
        domain.subjects = vec!["CHEM".into()];
        domain.batches = vec![Batch::new(
            "AK-JR-1",
            "Building_1",
            [SlotId(0), SlotId(2)],
            [SubjectId::from("CHEM")],
        )];

        let mut timetable = Timetable::default();
        timetable.set("AK-JR-1".into(), SlotId(0), Cell::Free);
        timetable.set("AK-JR-1".into(), SlotId(1), Cell::Lunch);
        timetable.set(
            "AK-JR-1".into(),
            SlotId(2),
            Cell::Lesson(Lesson {
                subject: "CHEM".into(),
                occupancy: Occupancy::Double,
                teachers: vec![TeacherId::from("PRK"), TeacherId::from("KK, SR")],
            }),
        );
        (domain, timetable)
    }

    #[test]
    fn tables_show_lessons_breaks_and_double_placements() {
        let (domain, timetable) = sample();
        let mut out = Vec::new();
        write_timetable(&mut out, &domain, &timetable).expect("writing to memory succeeds");
        let text = String::from_utf8(out).expect("utf-8");

        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Building_1");
        assert!(lines[1].starts_with("Batch"));
        assert!(lines[3].contains("LUNCH BREAK"));
        assert!(lines[3].contains("CHEM - PRK/KK, SR (2x)"));
        assert!(!text.contains("Building_2"));
    }

    #[test]
    fn single_lessons_have_no_marker() {
        let lesson = Lesson {
            subject: "MATHS".into(),
            occupancy: Occupancy::Single(Session::Second),
            teachers: vec![TeacherId::from("SRIKANTH")],
        };
        assert_eq!(lesson_text(&lesson), "MATHS - SRIKANTH");
    }

    #[test]
    fn csv_rows_cover_placed_lessons_only() {
        let (domain, timetable) = sample();
        let mut out = Vec::new();
        write_csv(&mut out, &domain, &timetable).expect("writing to memory succeeds");

        assert_eq!(
            String::from_utf8(out).expect("utf-8"),
            "Batch,Time_Slot,Subject,Teacher\nAK-JR-1,5:30-7:00,CHEM (2x),\"PRK/KK, SR\"\n"
        );
    }
}
