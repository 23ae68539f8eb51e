use maplit::hashmap;

use super::metric_catalog::*;
use super::predicates::{self, CHANNEL, LEADS_TYPE, SEND_TO_DEALER};
use super::source_kind::SourceKind;

fn metric(name: &str) -> Operand {
    Operand::Metric(name.to_string())
}

fn ratio(name: &str, numerator: Operand, denominator: Operand) -> DerivedDefinition {
    DerivedDefinition {
        name: name.to_string(),
        numerator,
        denominator,
    }
}

fn column_source(
    kind: SourceKind,
    entity_column: &str,
    date_column: &str,
    metrics: &[(&str, &str)],
) -> SourceSpec {
    SourceSpec {
        kind,
        sheets: SheetMode::Single,
        entity_column: entity_column.to_string(),
        date: DateSource::Column(date_column.to_string()),
        metrics: metrics
            .iter()
            .map(|(column, name)| MetricColumn::new(column, name))
            .collect(),
        attributes: Vec::new(),
        predicates: Vec::new(),
    }
}

impl MetricCatalog {
    /// Рабочий каталог отчёта по дилерам
    pub fn standard() -> Self {
        let video = column_source(
            SourceKind::Video,
            "主机厂经销商id",
            "日期",
            &[
                ("锚点曝光次数", "anchor_exposures"),
                ("锚点点击次数", "component_clicks"),
                ("新发布视频数", "short_video_count"),
                ("短视频表单提交商机量", "short_video_leads"),
            ],
        );

        let live = column_source(
            SourceKind::Live,
            "主机厂经销商id列表",
            "开播日期",
            &[
                ("超25分钟直播时长(分)", "over25_min_live_mins"),
                ("直播有效时长(小时)", "live_effective_hours"),
                ("超25min直播总场次", "effective_live_sessions"),
                ("曝光人数", "exposures"),
                ("场观", "viewers"),
                ("小风车点击次数(不含小雪花)", "small_wheel_clicks"),
            ],
        );

        let msg = SourceSpec {
            sheets: SheetMode::Multi,
            date: DateSource::SheetLabel,
            ..column_source(
                SourceKind::Msg,
                "主机厂经销商ID",
                "",
                &[
                    ("进入私信客户数", "enter_private_count"),
                    ("主动咨询客户数", "private_open_count"),
                    ("私信留资客户数", "private_leads_count"),
                ],
            )
        };

        let account_bi = column_source(
            SourceKind::AccountBi,
            "主机厂经销商id列表",
            "日期",
            &[
                ("直播间表单提交商机量", "live_leads"),
                ("短-播放量", "short_video_plays"),
            ],
        );

        let leads = column_source(
            SourceKind::Leads,
            "主机厂经销商id列表",
            "留资日期",
            &[("直播间表单提交商机量(去重)", "small_wheel_leads")],
        );

        let dr = SourceSpec {
            attributes: vec![
                MetricColumn::new("leads_type", LEADS_TYPE),
                MetricColumn::new("mkt_second_channel_name", CHANNEL),
                MetricColumn::new("send2dealer_id", SEND_TO_DEALER),
            ],
            predicates: vec![
                PredicateMetric::new("natural_leads", predicates::is_natural_lead),
                PredicateMetric::new("paid_leads", predicates::is_paid_lead),
                PredicateMetric::new("store_paid_leads", predicates::is_store_paid_lead),
                PredicateMetric::new("area_paid_leads", predicates::is_area_paid_lead),
                PredicateMetric::new("local_leads", predicates::is_local_lead),
            ],
            ..column_source(SourceKind::Dr, "reg_dealer", "register_time", &[])
        };

        let spending = SourceSpec {
            sheets: SheetMode::Multi,
            ..column_source(
                SourceKind::Spending,
                "NSC CODE",
                "Date",
                &[("Spending(Net)", "spending_net")],
            )
        };

        let composites = vec![
            Composite {
                name: "total_leads".to_string(),
                terms: vec![("natural_leads".to_string(), 1.0), ("paid_leads".to_string(), 1.0)],
            },
            Composite {
                name: "paid_area_leads".to_string(),
                terms: vec![
                    ("store_paid_leads".to_string(), 1.0),
                    ("area_paid_leads".to_string(), 1.0),
                ],
            },
            Composite {
                name: "over25_live_hours".to_string(),
                terms: vec![("over25_min_live_mins".to_string(), 1.0 / 60.0)],
            },
        ];

        let days = || Operand::EffectiveDays;
        let derived = vec![
            ratio("total_cpl", metric("spending_net"), metric("total_leads")),
            ratio("paid_cpl", metric("spending_net"), metric("paid_area_leads")),
            ratio("local_leads_ratio", metric("local_leads"), metric("total_leads")),
            ratio("avg_daily_spending", metric("spending_net"), days()),
            ratio("avg_daily_paid_leads", metric("paid_area_leads"), days()),
            ratio("avg_daily_over25_live_hours", metric("over25_live_hours"), days()),
            ratio(
                "avg_exposures_per_session",
                metric("exposures"),
                metric("effective_live_sessions"),
            ),
            ratio("exposure_to_viewer_rate", metric("viewers"), metric("exposures")),
            ratio(
                "avg_viewers_per_session",
                metric("viewers"),
                metric("effective_live_sessions"),
            ),
            ratio("small_wheel_click_rate", metric("small_wheel_clicks"), metric("viewers")),
            ratio(
                "small_wheel_leads_rate",
                metric("small_wheel_leads"),
                metric("small_wheel_clicks"),
            ),
            ratio(
                "avg_small_wheel_leads_per_session",
                metric("small_wheel_leads"),
                metric("effective_live_sessions"),
            ),
            ratio(
                "avg_small_wheel_clicks_per_session",
                metric("small_wheel_clicks"),
                metric("effective_live_sessions"),
            ),
            ratio(
                "component_click_rate",
                metric("component_clicks"),
                metric("anchor_exposures"),
            ),
            ratio(
                "component_leads_rate",
                metric("short_video_leads"),
                metric("anchor_exposures"),
            ),
            ratio(
                "component_leads_per_click",
                Operand::Derived("component_leads_rate".to_string()),
                Operand::Derived("component_click_rate".to_string()),
            ),
            ratio("avg_daily_private_entrants", metric("enter_private_count"), days()),
            ratio("avg_daily_private_opens", metric("private_open_count"), days()),
            ratio("avg_daily_private_leads", metric("private_leads_count"), days()),
            ratio(
                "private_open_rate",
                metric("private_open_count"),
                metric("enter_private_count"),
            ),
            ratio(
                "private_leads_rate",
                metric("private_leads_count"),
                metric("private_open_count"),
            ),
            ratio(
                "private_conversion_rate",
                metric("private_leads_count"),
                metric("enter_private_count"),
            ),
        ];

        let display_names = hashmap! {
            // video
            "anchor_exposures" => "锚点曝光量",
            "component_clicks" => "组件点击次数",
            "short_video_count" => "短视频条数",
            "short_video_leads" => "组件留资人数(获取线索量)",
            // live
            "over25_min_live_mins" => "超25分钟直播时长(分)",
            "live_effective_hours" => "直播有效时长(小时)",
            "effective_live_sessions" => "有效直播场次",
            "exposures" => "曝光人数",
            "viewers" => "场观",
            "small_wheel_clicks" => "小风车点击次数",
            // msg
            "enter_private_count" => "进私人数",
            "private_open_count" => "私信开口人数",
            "private_leads_count" => "咨询留资人数",
            // account_bi, leads
            "live_leads" => "直播线索量",
            "short_video_plays" => "短视频播放量",
            "small_wheel_leads" => "小风车留资量",
            // dr
            "natural_leads" => "自然线索量",
            "paid_leads" => "付费线索量",
            "store_paid_leads" => "车云店付费线索",
            "area_paid_leads" => "区域加码付费线索",
            "local_leads" => "本地线索量",
            // spending
            "spending_net" => "车云店+区域投放总金额",
            // composites
            "total_leads" => "总线索量",
            "paid_area_leads" => "车云店+区域付费线索量",
            "over25_live_hours" => "超25分钟直播时长(小时)",
            // derived
            "total_cpl" => "车云店+区域综合CPL",
            "paid_cpl" => "直播付费CPL",
            "local_leads_ratio" => "本地线索占比",
            "avg_daily_spending" => "直播车云店+区域日均消耗",
            "avg_daily_paid_leads" => "直播车云店+区域付费线索量日均",
            "avg_daily_over25_live_hours" => "日均有效(25min以上)时长(h)",
            "avg_exposures_per_session" => "场均曝光人数",
            "exposure_to_viewer_rate" => "曝光进入率",
            "avg_viewers_per_session" => "场均场观",
            "small_wheel_click_rate" => "小风车点击率",
            "small_wheel_leads_rate" => "小风车点击留资率",
            "avg_small_wheel_leads_per_session" => "场均小风车留资量",
            "avg_small_wheel_clicks_per_session" => "场均小风车点击次数",
            "component_click_rate" => "组件点击率",
            "component_leads_rate" => "组件留资率",
            "component_leads_per_click" => "组件点击留资率",
            "avg_daily_private_entrants" => "日均进私人数",
            "avg_daily_private_opens" => "日均私信开口人数",
            "avg_daily_private_leads" => "日均咨询留资人数",
            "private_open_rate" => "私信咨询率",
            "private_leads_rate" => "咨询留资率",
            "private_conversion_rate" => "私信转化率",
        }
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut catalog = MetricCatalog {
            sources: vec![video, live, msg, account_bi, leads, dr, spending],
            dimension: DimensionSpec {
                tier_entity_column: "NSC_id".to_string(),
                tier_column: "第二期层级".to_string(),
                store_entity_column: "NSC Code".to_string(),
                store_name_column: "抖音id".to_string(),
            },
            composites,
            derived,
            tier_normalized: Vec::new(),
            labels: DisplayLabels {
                entity_id: "经销商ID".to_string(),
                display_name: "门店名".to_string(),
                tier: "层级".to_string(),
                entity_count: "门店数".to_string(),
                effective_days: "有效天数".to_string(),
                window_prefixes: Windowed::new(String::new(), "T月".to_string(), "T-1月".to_string()),
            },
            display_names,
        };
        // Все абсолютные суммы (база + композиты) делятся на число магазинов
        catalog.tier_normalized = catalog.aggregated_metrics();
        catalog
    }
}
