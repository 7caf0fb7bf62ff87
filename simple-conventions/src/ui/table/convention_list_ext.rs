use comfy_table::{Cell, ContentArrangement};

use crate::convention::PodConvention;

pub trait ConventionListExt {
    fn render_table(&self) -> String;
}

impl ConventionListExt for [PodConvention] {
    fn render_table(&self) -> String {
        let rows = self
            .iter()
            .map(|convention| {
                [
                    Cell::new(&convention.id),
                    Cell::new(&convention.source),
                    Cell::new(convention.mutation.description()),
                ]
            })
            .collect::<Vec<_>>();

        comfy_table::Table::new()
            .load_preset(comfy_table::presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["ID", "SOURCE", "EFFECT"])
            .add_rows(rows)
            .to_string()
    }
}
