use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use trial_cli::types::{RunResult, SourceSummary};
use trial_transform::LabelVocabulary;

pub fn print_summary(result: &RunResult) {
    println!("Output: {}", result.processed_dir.display());
    println!("Vocabulary: {}", result.outputs.vocabulary.display());
    print_source_table(&result.sources);
    print_stage_table(result);
    print_class_table(result);
}

fn print_source_table(sources: &[SourceSummary]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Rows"),
        header_cell("Dropped status"),
        header_cell("Issue"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for source in sources {
        let name = if source.loaded() {
            Cell::new(&source.file_name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold)
        } else {
            dim_cell(&source.file_name)
        };
        table.add_row(vec![
            name,
            match source.rows {
                Some(rows) => Cell::new(rows),
                None => dim_cell("-"),
            },
            count_cell(source.dropped_status_rows, Color::Yellow),
            match &source.issue {
                Some(issue) => Cell::new(issue).fg(Color::Yellow),
                None => dim_cell("-"),
            },
        ]);
    }
    println!("{table}");
}

fn print_stage_table(result: &RunResult) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Stage"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);

    let merge = &result.merge;
    let per_table_duplicates: usize = merge.tables.iter().map(|t| t.duplicates_dropped).sum();
    let missing_keys: usize = merge.tables.iter().map(|t| t.missing_key_rows).sum();
    let imputation = &result.imputation;
    let rows: Vec<(&str, Cell)> = vec![
        ("Trials merged", Cell::new(result.merged_trials)),
        ("Excluded sources", count_cell(merge.excluded_sources().len(), Color::Yellow)),
        ("Duplicates within sources", count_cell(per_table_duplicates, Color::Yellow)),
        ("Duplicates across sources", count_cell(merge.cross_table_duplicates, Color::Yellow)),
        ("Rows without identifier", count_cell(missing_keys, Color::Yellow)),
        ("Values coalesced", Cell::new(merge.coalesced_values)),
        ("Rows after intervention", Cell::new(result.expansion.rows_after_intervention)),
        ("Rows after condition", Cell::new(result.expansion.rows_after_condition)),
        ("Enrollment known", Cell::new(imputation.known)),
        ("Enrollment unparsable", count_cell(imputation.unparsable, Color::Yellow)),
        ("Imputed from neighbours", Cell::new(imputation.imputed_from_neighbours)),
        ("Imputed from column median", Cell::new(imputation.imputed_from_column)),
        ("Vocabulary classes", Cell::new(result.vocabulary_classes)),
    ];
    for (label, cell) in rows {
        table.add_row(vec![Cell::new(label), cell]);
    }
    println!("{table}");
}

fn print_class_table(result: &RunResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Label"),
        header_cell("Trials"),
        header_cell("Rows"),
        header_cell("Train"),
        header_cell("Test"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for class in &result.split.classes {
        let trials = result
            .status_counts
            .iter()
            .find(|(status, _)| status.as_str() == class.label)
            .map(|(_, count)| *count);
        table.add_row(vec![
            Cell::new(&class.label)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            match trials {
                Some(count) => Cell::new(count),
                None => dim_cell("-"),
            },
            Cell::new(class.total),
            Cell::new(class.train()),
            Cell::new(class.test),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(result.merged_trials).add_attribute(Attribute::Bold),
        Cell::new(result.split.rows).add_attribute(Attribute::Bold),
        Cell::new(result.split.train_rows).add_attribute(Attribute::Bold),
        Cell::new(result.split.test_rows).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

pub fn print_vocabulary(vocabulary: &LabelVocabulary) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Classes"),
        header_cell("Unknown code"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for name in vocabulary.column_names() {
        let Some(column) = vocabulary.column(name) else {
            continue;
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(column.len()),
            match column.code(trial_model::columns::UNKNOWN) {
                Some(code) => Cell::new(code),
                None => dim_cell("-"),
            },
        ]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(value: usize, color: Color) -> Cell {
    if value > 0 {
        Cell::new(value).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(value)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
