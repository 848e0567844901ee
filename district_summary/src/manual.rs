/*!

This is the long-form manual for `district_summary` and `sentinel`.

## Input formats

The following formats are supported:
* `csv` Comma Separated Values, with a header row
* `xlsx` Excel spreadsheets, the first row of the worksheet being the header

Each input belongs to one of three categories:
* `enrolment` new enrolments, by age bracket
* `biometric` biometric updates, by age bracket
* `demographic` demographic updates, by age bracket

### csv

Every file must have a `state` and a `district` column. Header names are not case sensitive
and surrounding whitespace is ignored: ` State ` and `state` are the same column.

```text
date,state,district,pincode,age_0_5,age_5_17,age_18_greater
01-03-2025,Maharashtra, Pune ,411001,10,20,5
```

Blank cells are missing values, and so are the usual markers `NA`, `N/A`, `NaN`, `null`,
`None` or `#N/A`. A column that contains some text (such as `date` above) is
not summed and does not appear in the output.

### xlsx

Same layout as the CSV files. The first worksheet is used unless a worksheet name is given in
the configuration.

## Output

One row per `(state, district)` pair, both uppercased and trimmed. The columns are the key,
every summed numeric column of the three categories, and the derived fields:

| field                 | formula                                                            |
|-----------------------|--------------------------------------------------------------------|
| `total_enrol`         | `age_0_5 + age_5_17 + age_18_greater`                              |
| `total_updates`       | `bio_age_5_17 + bio_age_17_ + demo_age_5_17 + demo_age_17_`        |
| `vulnerability_score` | `total_updates / (total_enrol + 1)`                                |

Counters that are absent from all the inputs count as zero.

When the same column appears in two categories (typically `pincode`), the first one is renamed
`<name>_x` and the second one `<name>_y`.

A district that appears in only some categories still gets a row. The values of the
categories where it is absent are zero: an absent category and a legitimate zero count are
not distinguished.

## Categories

By default, `sentinel` looks for all the `.csv` and `.xlsx` files under the working directory
and assigns each file to the categories whose keyword appears in its path (relative to the
working directory, not case sensitive). A path that contains several keywords is used for each
of these categories, and a warning is printed.

To avoid this ambiguity, provide a configuration file with an explicit category for every
source:

```json
{
  "outputSettings": { "outputFile": "processed_aadhaar_data.csv" },
  "sources": [
    { "category": "enrolment", "filePath": "data/enrolment_2025.csv" },
    { "category": "biometric", "filePath": "data/updates.xlsx", "worksheetName": "biometric" },
    { "category": "demographic", "filePath": "data/updates.xlsx", "worksheetName": "demographic" }
  ]
}
```

File paths are relative to the directory of the configuration file.

## Failures

* no input file at all: the run stops.
* a file that cannot be read, or without `state`/`district` columns: the file is skipped
  with a warning.
* no enrolment record: the run stops before writing anything.
* no biometric or demographic record: the category is left out, with a warning.
* the output cannot be written: the run fails.

 */
