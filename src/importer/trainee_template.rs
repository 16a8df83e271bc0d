// ==========================================
// 研究生培训档案系统 - 学员表模板与格式转换
// ==========================================
// 输出: 工作表 "Trainee Data", 五列标准表头 (加粗), 列宽 20
// 转换: 按关键词为每个标准列挑选最匹配的源列, 逐行复制
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{read_sheet_grid, UploadedFile};
use crate::importer::row_adapter::TRAINEE_HEADERS;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::info;

/// 模板工作表名
pub const TRAINEE_SHEET_NAME: &str = "Trainee Data";

const COLUMN_WIDTH: f64 = 20.0;

/// 模板示例行
const EXAMPLE_ROWS: [[&str; 5]; 3] = [
    ["1", "John Doe", "2024-01-15", "MS", "Dr. Smith"],
    ["2", "Jane Smith", "2024-02-01", "FCPS", "Dr. Johnson"],
    ["3", "Ahmed Ali", "2024-03-10", "", "Dr. Khan"],
];

/// 新建带标准表头的工作簿
fn new_trainee_workbook() -> ImportResult<Workbook> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(TRAINEE_SHEET_NAME)?;
    for (col, header) in TRAINEE_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        sheet.set_column_width(col as u16, COLUMN_WIDTH)?;
    }
    Ok(workbook)
}

/// 写单元格: 可解析为数字的写数字, 其余写文本, 空串跳过
fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &str) -> ImportResult<()> {
    if value.is_empty() {
        return Ok(());
    }
    match value.parse::<f64>() {
        Ok(number) if col == 0 => {
            sheet.write_number(row, col, number)?;
        }
        _ => {
            sheet.write_string(row, col, value)?;
        }
    }
    Ok(())
}

/// 生成空白导入模板 (含三行示例)
pub fn generate_trainee_template() -> ImportResult<Vec<u8>> {
    let mut workbook = new_trainee_workbook()?;
    let sheet = workbook.worksheet_from_index(0)?;
    for (idx, example) in EXAMPLE_ROWS.iter().enumerate() {
        for (col, value) in example.iter().enumerate() {
            write_cell(sheet, idx as u32 + 1, col as u16, value)?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}

// ==========================================
// 格式转换
// ==========================================

/// 源表头对某个标准列的匹配分 (0 = 不匹配)
fn header_score(target: usize, source_header: &str) -> u8 {
    let lower = source_header.to_lowercase();
    let any = |keywords: &[&str]| contains_any(&lower, keywords);
    match target {
        0 => u8::from(any(&["sr", "serial", "no", "number", "sno"])),
        1 if any(&["trainee", "name"]) => 2,
        1 => u8::from(any(&["student", "pg"])),
        2 if any(&["joining", "doj"]) => 2,
        2 => u8::from(any(&["date", "join"])),
        3 => u8::from(any(&["ms", "fcps", "qualification", "degree"])),
        4 if any(&["supervisor"]) => 2,
        4 => u8::from(any(&["mentor", "guide"])),
        _ => 0,
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// 为每个标准列挑选得分最高的源列 (同分取靠前者)
pub fn map_trainee_columns(source_headers: &[String]) -> [Option<usize>; 5] {
    let mut mapping = [None; 5];
    for (target, slot) in mapping.iter_mut().enumerate() {
        let mut best_score = 0;
        for (idx, header) in source_headers.iter().enumerate() {
            if header.trim().is_empty() {
                continue;
            }
            let score = header_score(target, header);
            if score > best_score {
                best_score = score;
                *slot = Some(idx);
            }
        }
    }
    mapping
}

/// 将任意表格转换为学员导入格式
///
/// 无源列映射到 "Sr. No." 时按输出行自动编号
pub fn convert_to_trainee_format(file: &UploadedFile) -> ImportResult<Vec<u8>> {
    let kind = file
        .kind()
        .filter(|k| k.is_spreadsheet())
        .ok_or_else(|| ImportError::UnsupportedFormat {
            name: file.name.clone(),
            supported: ".xlsx/.xls",
        })?;
    if file.bytes.is_empty() {
        return Err(ImportError::EmptyFile(file.name.clone()));
    }

    let mut rows = read_sheet_grid(kind, &file.bytes)?.rows.into_iter();
    let (_, source_headers) = rows.next().ok_or(ImportError::MissingHeader)?;
    let mapping = map_trainee_columns(&source_headers);

    let mut workbook = new_trainee_workbook()?;
    let sheet = workbook.worksheet_from_index(0)?;
    let mut output_row: u32 = 1;
    for (_, cells) in rows {
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        for (col, source) in mapping.iter().enumerate() {
            match source {
                Some(src) => {
                    let value = cells.get(*src).map(String::as_str).unwrap_or("");
                    write_cell(sheet, output_row, col as u16, value)?;
                }
                None if col == 0 => {
                    sheet.write_number(output_row, 0, output_row as f64)?;
                }
                None => {}
            }
        }
        output_row += 1;
    }

    info!(file = %file.name, rows = output_row - 1, "学员表格式转换完成");
    Ok(workbook.save_to_buffer()?)
}
